use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::error::LinkError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// A single normalized row. Absent and blank attributes are both "missing".
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: HashMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.fields.insert(column.to_string(), value.to_string());
        self
    }

    /// Attribute value, `None` when absent or blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Records of one side, in input order, with unique ids.
#[derive(Debug, Clone)]
pub struct RecordSet {
    pub side: Side,
    columns: Vec<String>,
    records: Vec<Record>,
    by_id: HashMap<String, usize>,
}

impl RecordSet {
    pub fn new(side: Side, columns: Vec<String>) -> Self {
        Self {
            side,
            columns,
            records: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Build from records, taking the column list from the union of their
    /// fields (sorted).
    pub fn from_records(side: Side, records: Vec<Record>) -> Result<Self, LinkError> {
        let mut columns: Vec<String> = records
            .iter()
            .flat_map(|r| r.fields.keys().cloned())
            .collect();
        columns.sort();
        columns.dedup();
        let mut set = Self::new(side, columns);
        for record in records {
            set.push(record)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, record: Record) -> Result<(), LinkError> {
        if self.by_id.contains_key(&record.id) {
            return Err(LinkError::DuplicateId {
                side: self.side,
                id: record.id,
            });
        }
        self.by_id.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Error unless every named column exists in this table.
    pub fn require_columns<'a>(
        &self,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), LinkError> {
        for column in columns {
            if !self.has_column(column) {
                return Err(LinkError::MissingColumn {
                    side: self.side,
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    /// Drop every record whose id is in `ids`, keeping input order.
    pub fn remove_ids(&mut self, ids: &std::collections::HashSet<&str>) {
        self.records.retain(|r| !ids.contains(r.id.as_str()));
        self.by_id = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }

    pub(crate) fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Number of distinct values in `column`, or of ids when `column` is
    /// `None`. Missing values count as one bucket.
    pub fn distinct_count(&self, column: Option<&str>) -> usize {
        match column {
            None => self.records.len(),
            Some(col) => {
                let mut seen: Vec<Option<&str>> = self.records.iter().map(|r| r.get(col)).collect();
                seen.sort();
                seen.dedup();
                seen.len()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// One candidate pair's comparison results, in rule order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub left_id: String,
    pub right_id: String,
    pub values: Vec<f64>,
}

impl FeatureRow {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Feature vectors for a set of candidate pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureTable {
    pub labels: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same labels, subset of rows.
    pub fn with_rows(&self, rows: Vec<FeatureRow>) -> Self {
        Self {
            labels: self.labels.clone(),
            rows,
        }
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// A resolved (left, right) association with the attributes kept for
/// reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub left_id: String,
    pub right_id: String,
    pub pass: String,
    pub score: f64,
    pub features: BTreeMap<String, f64>,
    pub left: BTreeMap<String, Option<String>>,
    pub right: BTreeMap<String, Option<String>>,
}

// ---------------------------------------------------------------------------
// Accounting + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolAccounting {
    pub matched: usize,
    pub matched_distinct: usize,
    pub unmatched: usize,
    pub unmatched_distinct: usize,
}

/// Total score → number of candidate pairs, highest score first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub buckets: Vec<ScoreBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBucket {
    pub score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
    pub name: String,
    pub pool_before: usize,
    pub candidates: usize,
    pub score_distribution: ScoreDistribution,
    pub plausible: usize,
    pub best_matches: usize,
    pub accounting: PoolAccounting,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkResult {
    pub meta: LinkMeta,
    pub passes: Vec<PassSummary>,
    pub accounting: PoolAccounting,
    pub matches: Vec<Match>,
    pub unmatched_ids: Vec<String>,
}

impl LinkResult {
    pub fn to_json_pretty(&self) -> Result<String, LinkError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LinkError::Io(format!("JSON serialization error: {e}")))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub left_records: usize,
    pub right_records: usize,
}
