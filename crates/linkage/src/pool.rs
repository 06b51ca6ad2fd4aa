//! The partition of left records into matched and not-yet-matched across
//! sequential passes.

use std::collections::HashSet;

use log::info;
use serde::Serialize;

use crate::error::LinkError;
use crate::model::{Match, PoolAccounting, RecordSet, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Unmatched,
    Matched,
}

/// Left records split into UNMATCHED and MATCHED. MATCHED is terminal.
#[derive(Debug, Clone)]
pub struct MatchPool {
    unmatched: RecordSet,
    matched_records: RecordSet,
    matches: Vec<Match>,
    count_column: Option<String>,
}

impl MatchPool {
    /// Start with every left record unmatched. `count_column` selects the
    /// column used for the deduplicated counts (left id when `None`).
    pub fn new(left: RecordSet, count_column: Option<String>) -> Result<Self, LinkError> {
        if let Some(col) = count_column.as_deref() {
            left.require_columns([col])?;
        }
        let matched_records = RecordSet::new(Side::Left, left.columns().to_vec());
        Ok(Self {
            unmatched: left,
            matched_records,
            matches: Vec::new(),
            count_column,
        })
    }

    pub fn unmatched(&self) -> &RecordSet {
        &self.unmatched
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn state(&self, left_id: &str) -> Option<MatchState> {
        if self.matched_records.contains(left_id) {
            Some(MatchState::Matched)
        } else if self.unmatched.contains(left_id) {
            Some(MatchState::Unmatched)
        } else {
            None
        }
    }

    pub fn matched_ids(&self) -> impl Iterator<Item = &str> {
        self.matched_records.ids()
    }

    /// Apply one pass's matches: append them, move their left records out of
    /// the unmatched pool, and report the new counts.
    ///
    /// Every left id is checked before anything changes, so a rejected update
    /// leaves the pool as it was.
    pub fn process_matched(&mut self, matches: Vec<Match>) -> Result<PoolAccounting, LinkError> {
        let ids: HashSet<&str> = matches.iter().map(|m| m.left_id.as_str()).collect();
        if let Some(bad) = ids.iter().find(|id| !self.unmatched.contains(id)) {
            return Err(LinkError::NotUnmatched { id: bad.to_string() });
        }

        for record in self.unmatched.records() {
            if ids.contains(record.id.as_str()) {
                self.matched_records.push(record.clone())?;
            }
        }
        self.unmatched.remove_ids(&ids);
        self.matches.extend(matches);

        let accounting = self.accounting();
        log_accounting(&accounting);
        Ok(accounting)
    }

    pub fn accounting(&self) -> PoolAccounting {
        let col = self.count_column.as_deref();
        PoolAccounting {
            matched: self.matches.len(),
            matched_distinct: self.matched_records.distinct_count(col),
            unmatched: self.unmatched.len(),
            unmatched_distinct: self.unmatched.distinct_count(col),
        }
    }

    pub fn into_parts(self) -> (Vec<Match>, RecordSet) {
        (self.matches, self.unmatched)
    }
}

fn log_accounting(a: &PoolAccounting) {
    info!("Num. of all matched records:                {}", a.matched);
    info!("Num. of all matched records deduplicated:   {}", a.matched_distinct);
    info!("Num. of not matched records:                {}", a.unmatched);
    info!("Num. of not matched records deduplicated:   {}", a.unmatched_distinct);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use std::collections::BTreeMap;

    fn left() -> RecordSet {
        RecordSet::from_records(
            Side::Left,
            vec![
                Record::new("JP1").with("name", "ACME"),
                Record::new("JP2").with("name", "ACME"),
                Record::new("JP3").with("name", "BETA"),
            ],
        )
        .unwrap()
    }

    fn m(left: &str, right: &str) -> Match {
        Match {
            left_id: left.into(),
            right_id: right.into(),
            pass: "p".into(),
            score: 1.0,
            features: BTreeMap::new(),
            left: BTreeMap::new(),
            right: BTreeMap::new(),
        }
    }

    #[test]
    fn starts_all_unmatched() {
        let pool = MatchPool::new(left(), None).unwrap();
        assert_eq!(pool.state("JP1"), Some(MatchState::Unmatched));
        assert_eq!(pool.state("nope"), None);
        assert_eq!(
            pool.accounting(),
            PoolAccounting { matched: 0, matched_distinct: 0, unmatched: 3, unmatched_distinct: 3 }
        );
    }

    #[test]
    fn process_moves_records() {
        let mut pool = MatchPool::new(left(), None).unwrap();
        // Two tying right ids for JP1.
        let acc = pool
            .process_matched(vec![m("JP1", "OR1"), m("JP1", "OR2"), m("JP3", "OR3")])
            .unwrap();
        assert_eq!(
            acc,
            PoolAccounting { matched: 3, matched_distinct: 2, unmatched: 1, unmatched_distinct: 1 }
        );
        assert_eq!(pool.state("JP1"), Some(MatchState::Matched));
        assert_eq!(pool.unmatched().ids().collect::<Vec<_>>(), vec!["JP2"]);
    }

    #[test]
    fn dedup_by_count_column() {
        let mut pool = MatchPool::new(left(), Some("name".into())).unwrap();
        let acc = pool.process_matched(vec![m("JP1", "OR1")]).unwrap();
        assert_eq!(acc.matched_distinct, 1);
        // JP2 (ACME) and JP3 (BETA) remain.
        assert_eq!(acc.unmatched, 2);
        assert_eq!(acc.unmatched_distinct, 2);
    }

    #[test]
    fn matched_is_terminal() {
        let mut pool = MatchPool::new(left(), None).unwrap();
        pool.process_matched(vec![m("JP1", "OR1")]).unwrap();
        let err = pool.process_matched(vec![m("JP2", "OR2"), m("JP1", "OR9")]).unwrap_err();
        assert!(matches!(err, LinkError::NotUnmatched { ref id } if id == "JP1"));
        // Rejected update changed nothing.
        assert_eq!(pool.state("JP2"), Some(MatchState::Unmatched));
        assert_eq!(pool.matches().len(), 1);
    }

    #[test]
    fn empty_update_is_fine() {
        let mut pool = MatchPool::new(left(), None).unwrap();
        let acc = pool.process_matched(Vec::new()).unwrap();
        assert_eq!(acc.unmatched, 3);
        assert_eq!(acc.matched, 0);
    }

    #[test]
    fn unknown_count_column() {
        assert!(MatchPool::new(left(), Some("city".into())).is_err());
    }
}
