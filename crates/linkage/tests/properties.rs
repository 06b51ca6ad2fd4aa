use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use orglink_linkage::model::{FeatureRow, FeatureTable, Match, Record, RecordSet, Side};
use orglink_linkage::pool::MatchPool;
use orglink_linkage::select::{best_matches, TiePolicy};
use orglink_linkage::similarity::{zip_partial, StringAlgorithm, StringComparator};

fn algorithms() -> Vec<StringAlgorithm> {
    [
        "jaro",
        "jarowinkler",
        "levenshtein",
        "damerau_levenshtein",
        "qgram",
        "cosine",
        "smith_waterman",
        "lcs",
    ]
    .iter()
    .map(|n| n.parse().unwrap())
    .collect()
}

fn tie_policy() -> impl Strategy<Value = TiePolicy> {
    prop_oneof![
        Just(TiePolicy::KeepAll),
        Just(TiePolicy::LowestRightId),
        Just(TiePolicy::FirstSeen),
        Just(TiePolicy::Reject),
    ]
}

/// Feature rows over a handful of ids so that groups and ties are common.
fn feature_table() -> impl Strategy<Value = FeatureTable> {
    prop::collection::vec((0u8..4, 0u8..4, prop::collection::vec(0u8..3, 3)), 0..20).prop_map(
        |rows| FeatureTable {
            labels: vec!["a".into(), "b".into(), "c".into()],
            rows: rows
                .into_iter()
                .map(|(l, r, v)| FeatureRow {
                    left_id: format!("L{l}"),
                    right_id: format!("R{r}"),
                    values: v.into_iter().map(|x| f64::from(x) / 2.0).collect(),
                })
                .collect(),
        },
    )
}

fn matched(left_id: &str) -> Match {
    Match {
        left_id: left_id.into(),
        right_id: "R".into(),
        pass: "p".into(),
        score: 1.0,
        features: BTreeMap::new(),
        left: BTreeMap::new(),
        right: BTreeMap::new(),
    }
}

proptest! {
    #[test]
    fn similarity_is_bounded(a in ".{0,24}", b in ".{0,24}") {
        for alg in algorithms() {
            let s = alg.similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s), "{alg}: {s}");
        }
    }

    #[test]
    fn similarity_of_identical_is_one(a in "[A-Z ]{2,24}") {
        prop_assume!(!a.trim().is_empty());
        for alg in algorithms() {
            let s = alg.similarity(&a, &a);
            prop_assert!((s - 1.0).abs() < 1e-9, "{alg}: {s}");
        }
    }

    #[test]
    fn binarized_output_is_zero_or_one(
        a in "[A-Z ]{0,16}",
        b in "[A-Z ]{0,16}",
        t in 0.0f64..=1.0,
        ts in 0.0f64..=1.0,
    ) {
        for alg in algorithms() {
            let cmp = StringComparator {
                algorithm: alg,
                threshold: Some(t),
                short_algorithm: StringAlgorithm::Levenshtein,
                short_threshold: Some(ts),
                len_short: 7,
            };
            let v = cmp.compare(&a, &b);
            prop_assert!(v == 0.0 || v == 1.0);
        }
    }

    #[test]
    fn zip_levels(a in "[0-9]{0,5}", b in "[0-9]{0,5}") {
        let v = zip_partial(&a, &b);
        prop_assert!([0.0, 0.25, 0.5, 1.0].contains(&v));
    }

    #[test]
    fn best_matches_is_idempotent(table in feature_table(), policy in tie_policy()) {
        let once = best_matches(&table, policy);
        let twice = best_matches(&once, policy);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn pool_is_monotone(batches in prop::collection::vec(prop::collection::btree_set(0usize..12, 0..5), 1..5)) {
        let left = RecordSet::from_records(
            Side::Left,
            (0..12).map(|i| Record::new(format!("L{i}")).with("name", "X")).collect(),
        )
        .unwrap();
        let mut pool = MatchPool::new(left, None).unwrap();
        let mut prev = pool.accounting();

        for batch in batches {
            let fresh: Vec<Match> = batch
                .iter()
                .map(|i| format!("L{i}"))
                .filter(|id| pool.unmatched().contains(id))
                .map(|id| matched(&id))
                .collect();
            let acc = pool.process_matched(fresh).unwrap();
            prop_assert!(acc.matched >= prev.matched);
            prop_assert!(acc.unmatched <= prev.unmatched);
            prop_assert_eq!(acc.matched_distinct + acc.unmatched, 12);
            prev = acc;

            let matched_ids: BTreeSet<&str> = pool.matched_ids().collect();
            let unmatched_ids: BTreeSet<&str> = pool.unmatched().ids().collect();
            prop_assert!(matched_ids.is_disjoint(&unmatched_ids));
            let all: BTreeSet<String> = matched_ids.union(&unmatched_ids).map(|id| id.to_string()).collect();
            let expected: BTreeSet<String> = (0..12).map(|i| format!("L{i}")).collect();
            prop_assert_eq!(all, expected);
        }
    }
}
