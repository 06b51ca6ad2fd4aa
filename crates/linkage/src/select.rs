//! Plausibility filtering and greedy best-match resolution.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::info;
use serde::{Deserialize, Serialize};

use crate::compare::{ComparisonRule, RuleRole};
use crate::error::LinkError;
use crate::model::{FeatureRow, FeatureTable, Match, Record, RecordSet};

pub const DEFAULT_MIN_EVIDENCE_SCORE: f64 = 2.5;

/// What to do when several right records share a left record's best score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Keep every tying right record (several matches per left id).
    #[default]
    KeepAll,
    /// Keep the tying right record with the smallest id.
    LowestRightId,
    /// Keep the tying right record that came first in candidate order.
    FirstSeen,
    /// Drop the left record for this pass when more than one right record ties.
    Reject,
}

/// Keep rows whose evidence columns sum to at least `min_evidence_score` and
/// where at least one name column agrees exactly.
pub fn plausible(
    table: &FeatureTable,
    rules: &[ComparisonRule],
    min_evidence_score: f64,
) -> Result<FeatureTable, LinkError> {
    if rules.len() != table.labels.len() {
        return Err(LinkError::ConfigValidation(format!(
            "{} rule(s) for a feature table with {} column(s)",
            rules.len(),
            table.labels.len()
        )));
    }

    let rows = table
        .rows
        .iter()
        .filter(|row| {
            let mut evidence = 0.0;
            let mut name_agrees = false;
            for (rule, value) in rules.iter().zip(&row.values) {
                match rule.role {
                    RuleRole::Evidence => evidence += value,
                    RuleRole::Name => name_agrees |= *value == 1.0,
                }
            }
            name_agrees && evidence >= min_evidence_score
        })
        .cloned()
        .collect();

    let filtered = table.with_rows(rows);
    info!("Num. of potential matches by name: {}", filtered.len());
    Ok(filtered)
}

/// Per left id, keep the row(s) with the maximal total score, resolved by
/// `policy`. Duplicate (left, right) rows collapse to their first occurrence.
///
/// Output is grouped by first appearance of the left id and otherwise keeps
/// input order, so running this on its own output returns it unchanged.
pub fn best_matches(table: &FeatureTable, policy: TiePolicy) -> FeatureTable {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&FeatureRow>> = HashMap::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for row in &table.rows {
        if !seen.insert((row.left_id.as_str(), row.right_id.as_str())) {
            continue;
        }
        groups
            .entry(row.left_id.as_str())
            .or_insert_with(|| {
                order.push(row.left_id.as_str());
                Vec::new()
            })
            .push(row);
    }

    let mut rows = Vec::new();
    for left_id in order {
        let group = &groups[left_id];
        let max = group
            .iter()
            .map(|r| r.total())
            .fold(f64::NEG_INFINITY, f64::max);
        let winners: Vec<&FeatureRow> =
            group.iter().copied().filter(|r| r.total() == max).collect();

        match policy {
            TiePolicy::KeepAll => rows.extend(winners.into_iter().cloned()),
            TiePolicy::FirstSeen => rows.extend(winners.first().map(|r| (*r).clone())),
            TiePolicy::LowestRightId => rows.extend(
                winners
                    .iter()
                    .min_by(|a, b| a.right_id.cmp(&b.right_id))
                    .map(|r| (*r).clone()),
            ),
            TiePolicy::Reject => {
                if winners.len() == 1 {
                    rows.push(winners[0].clone());
                }
            }
        }
    }

    table.with_rows(rows)
}

/// Columns carried into each match for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportColumns {
    #[serde(default)]
    pub left: Vec<String>,
    #[serde(default)]
    pub right: Vec<String>,
}

impl ReportColumns {
    /// Every column the rules read, in rule order, without repeats.
    pub fn from_rules(rules: &[ComparisonRule]) -> Self {
        let mut cols = Self::default();
        for rule in rules {
            if !cols.left.contains(&rule.left_on) {
                cols.left.push(rule.left_on.clone());
            }
            if !cols.right.contains(&rule.right_on) {
                cols.right.push(rule.right_on.clone());
            }
        }
        cols
    }
}

fn snapshot(record: &Record, columns: &[String]) -> BTreeMap<String, Option<String>> {
    columns
        .iter()
        .map(|c| (c.clone(), record.get(c).map(str::to_string)))
        .collect()
}

/// Turn winning feature rows into matches carrying both records' attributes.
pub fn augment(
    table: &FeatureTable,
    left: &RecordSet,
    right: &RecordSet,
    columns: &ReportColumns,
    pass: &str,
) -> Result<Vec<Match>, LinkError> {
    left.require_columns(columns.left.iter().map(String::as_str))?;
    right.require_columns(columns.right.iter().map(String::as_str))?;

    let mut matches = Vec::with_capacity(table.len());
    for row in &table.rows {
        let l = left.get(&row.left_id).ok_or_else(|| LinkError::UnknownRecord {
            side: left.side,
            id: row.left_id.clone(),
        })?;
        let r = right.get(&row.right_id).ok_or_else(|| LinkError::UnknownRecord {
            side: right.side,
            id: row.right_id.clone(),
        })?;
        matches.push(Match {
            left_id: row.left_id.clone(),
            right_id: row.right_id.clone(),
            pass: pass.to_string(),
            score: row.total(),
            features: table.labels.iter().cloned().zip(row.values.iter().copied()).collect(),
            left: snapshot(l, &columns.left),
            right: snapshot(r, &columns.right),
        });
    }
    Ok(matches)
}
