use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::LinkError;
use crate::model::{Record, RecordSet};

/// Key columns compared for exact equality, one list per side.
///
/// Deserializes from a single column name shared by both sides
/// (`block = "zip"`) or from per-side lists
/// (`block = { left = ["company_zipcode"], right = ["zip"] }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BlockingKeyRepr")]
pub struct BlockingKey {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlockingKeyRepr {
    Shared(String),
    PerSide { left: ColumnList, right: ColumnList },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnList {
    One(String),
    Many(Vec<String>),
}

impl From<ColumnList> for Vec<String> {
    fn from(c: ColumnList) -> Self {
        match c {
            ColumnList::One(s) => vec![s],
            ColumnList::Many(v) => v,
        }
    }
}

impl TryFrom<BlockingKeyRepr> for BlockingKey {
    type Error = String;

    fn try_from(repr: BlockingKeyRepr) -> Result<Self, Self::Error> {
        let key = match repr {
            BlockingKeyRepr::Shared(col) => Self::shared(&col),
            BlockingKeyRepr::PerSide { left, right } => Self {
                left: left.into(),
                right: right.into(),
            },
        };
        key.validate().map_err(|e| e.to_string())?;
        Ok(key)
    }
}

impl BlockingKey {
    pub fn shared(column: &str) -> Self {
        Self {
            left: vec![column.to_string()],
            right: vec![column.to_string()],
        }
    }

    pub fn per_side(left: &str, right: &str) -> Self {
        Self {
            left: vec![left.to_string()],
            right: vec![right.to_string()],
        }
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.left.is_empty() || self.right.is_empty() {
            return Err(LinkError::ConfigValidation(
                "blocking key needs at least one column per side".into(),
            ));
        }
        if self.left.len() != self.right.len() {
            return Err(LinkError::ConfigValidation(format!(
                "blocking key arity differs: {} left column(s), {} right column(s)",
                self.left.len(),
                self.right.len()
            )));
        }
        Ok(())
    }
}

/// Indices of a left and a right record sharing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair {
    pub left: usize,
    pub right: usize,
}

/// Key tuple of a record; `None` if any component is missing.
fn key_of<'a>(record: &'a Record, columns: &[String]) -> Option<Vec<&'a str>> {
    columns.iter().map(|c| record.get(c)).collect()
}

/// All (left, right) pairs with equal key tuples, in left order then right
/// order. Records with a missing key component join no block.
pub fn block(
    left: &RecordSet,
    right: &RecordSet,
    key: &BlockingKey,
) -> Result<Vec<CandidatePair>, LinkError> {
    key.validate()?;
    left.require_columns(key.left.iter().map(String::as_str))?;
    right.require_columns(key.right.iter().map(String::as_str))?;

    let mut right_blocks: HashMap<Vec<&str>, Vec<usize>> = HashMap::new();
    for (ri, record) in right.records().iter().enumerate() {
        if let Some(k) = key_of(record, &key.right) {
            right_blocks.entry(k).or_default().push(ri);
        }
    }

    let mut pairs = Vec::new();
    for (li, record) in left.records().iter().enumerate() {
        let Some(k) = key_of(record, &key.left) else {
            continue;
        };
        if let Some(block) = right_blocks.get(&k) {
            pairs.extend(block.iter().map(|&ri| CandidatePair { left: li, right: ri }));
        }
    }

    info!("Num. of candidates: {}", pairs.len());
    Ok(pairs)
}
