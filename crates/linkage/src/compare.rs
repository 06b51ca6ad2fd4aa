//! Feature computation: every comparison rule applied to every candidate pair.

use std::collections::BTreeMap;

use log::info;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::blocking::CandidatePair;
use crate::error::LinkError;
use crate::model::{FeatureRow, FeatureTable, Record, RecordSet, ScoreBucket, ScoreDistribution};
use crate::similarity::Comparator;

/// What a rule's output counts as during plausibility filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleRole {
    /// A name-variant comparison; one of these must agree exactly.
    Name,
    /// Secondary evidence (zip, city, state) summed against the minimum score.
    #[default]
    Evidence,
}

/// One labelled comparison between a left attribute and a right attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRule {
    pub label: String,
    pub left_on: String,
    pub right_on: String,
    pub role: RuleRole,
    pub comparator: Comparator,
    /// Output when either value is missing.
    pub missing_value: f64,
}

impl ComparisonRule {
    pub fn new(label: &str, left_on: &str, right_on: &str, comparator: Comparator) -> Self {
        Self {
            label: label.to_string(),
            left_on: left_on.to_string(),
            right_on: right_on.to_string(),
            role: RuleRole::Evidence,
            comparator,
            missing_value: 0.0,
        }
    }

    pub fn role(mut self, role: RuleRole) -> Self {
        self.role = role;
        self
    }

    pub fn missing_value(mut self, value: f64) -> Self {
        self.missing_value = value;
        self
    }

    pub fn evaluate(&self, left: &Record, right: &Record) -> f64 {
        match (left.get(&self.left_on), right.get(&self.right_on)) {
            (Some(l), Some(r)) => self.comparator.compare(l, r),
            _ => self.missing_value,
        }
    }
}

/// Check a rule list before it is used: non-empty, unique labels, and at
/// least one name rule for the plausibility filter to accept anything.
pub fn validate_rules(rules: &[ComparisonRule]) -> Result<(), LinkError> {
    if rules.is_empty() {
        return Err(LinkError::ConfigValidation("rule list is empty".into()));
    }
    let mut labels: Vec<&str> = rules.iter().map(|r| r.label.as_str()).collect();
    labels.sort_unstable();
    if let Some(dup) = labels.windows(2).find(|w| w[0] == w[1]) {
        return Err(LinkError::ConfigValidation(format!(
            "duplicate rule label '{}'",
            dup[0]
        )));
    }
    if !rules.iter().any(|r| r.role == RuleRole::Name) {
        return Err(LinkError::ConfigValidation(
            "at least one rule must have role = \"name\"".into(),
        ));
    }
    Ok(())
}

/// Compute the feature table for `pairs`, preserving pair and rule order.
pub fn compute_features(
    pairs: &[CandidatePair],
    left: &RecordSet,
    right: &RecordSet,
    rules: &[ComparisonRule],
) -> Result<FeatureTable, LinkError> {
    validate_rules(rules)?;
    left.require_columns(rules.iter().map(|r| r.left_on.as_str()))?;
    right.require_columns(rules.iter().map(|r| r.right_on.as_str()))?;

    let labels: Vec<String> = rules.iter().map(|r| r.label.clone()).collect();
    let left_records = left.records();
    let right_records = right.records();

    let rows: Vec<FeatureRow> = pairs
        .par_iter()
        .map(|pair| {
            let l = &left_records[pair.left];
            let r = &right_records[pair.right];
            FeatureRow {
                left_id: l.id.clone(),
                right_id: r.id.clone(),
                values: rules.iter().map(|rule| rule.evaluate(l, r)).collect(),
            }
        })
        .collect();

    let table = FeatureTable { labels, rows };
    log_distribution(&score_distribution(&table));
    Ok(table)
}

/// Count of rows per distinct total score, highest first.
pub fn score_distribution(table: &FeatureTable) -> ScoreDistribution {
    let mut counts: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();
    for row in &table.rows {
        *counts.entry(OrderedFloat(row.total())).or_insert(0) += 1;
    }
    ScoreDistribution {
        buckets: counts
            .into_iter()
            .rev()
            .map(|(score, count)| ScoreBucket {
                score: score.into_inner(),
                count,
            })
            .collect(),
    }
}

fn log_distribution(dist: &ScoreDistribution) {
    if dist.buckets.is_empty() {
        info!("Comparison results: no candidate pairs");
        return;
    }
    let body: Vec<String> = dist
        .buckets
        .iter()
        .map(|b| format!("{:>6.2}  {}", b.score, b.count))
        .collect();
    info!("Comparison results:\n{}", body.join("\n"));
}
