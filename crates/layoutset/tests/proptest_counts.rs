//! Property-based tests for the derived count mapping.
//!
//! Validates the count invariants:
//! - For every category, the count equals the number of current records
//!   with that category
//! - No zero-valued entry ever remains in the mapping
//! - Replace-import is idempotent

use proptest::prelude::*;
use roomtag_core::Vocabulary;
use roomtag_layoutset::{LayoutSet, SerializedSet};
use std::collections::BTreeMap;

const NAMES: [&str; 4] = ["wall", "floor", "chair", "table"];

/// One random mutation of the collection.
#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Delete(usize),
    DeleteAll,
    MergeImport(Vec<u32>),
    ReplaceImport(Vec<u32>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..NAMES.len()).prop_map(Op::Add),
        3 => (0usize..16).prop_map(Op::Delete),
        1 => Just(Op::DeleteAll),
        1 => prop::collection::vec(0u32..NAMES.len() as u32, 0..4).prop_map(Op::MergeImport),
        1 => prop::collection::vec(0u32..NAMES.len() as u32, 0..4).prop_map(Op::ReplaceImport),
    ]
}

fn serialized(labels: &[u32]) -> SerializedSet {
    SerializedSet {
        bboxes: vec![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]; labels.len()],
        labels: labels.to_vec(),
    }
}

fn recount(set: &LayoutSet) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in set.records() {
        let name = set.vocabulary().name(record.category).unwrap().to_string();
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
}

proptest! {
    /// Property: after any operation sequence the mapping matches a full
    /// recount and holds no zero entries.
    #[test]
    fn counts_match_records(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut set = LayoutSet::new(Vocabulary::from_names(&NAMES).unwrap());
        for op in ops {
            match op {
                Op::Add(i) => { set.add(NAMES[i]).unwrap(); }
                Op::Delete(i) => { set.delete(i); }
                Op::DeleteAll => { set.delete_all(); }
                Op::MergeImport(labels) => { set.import(&serialized(&labels), false).unwrap(); }
                Op::ReplaceImport(labels) => { set.import(&serialized(&labels), true).unwrap(); }
            }

            prop_assert_eq!(set.named_counts(), recount(&set));
            prop_assert!(set.counts().values().all(|&n| n > 0));
        }
    }

    /// Property: ids stay strictly increasing in creation order no matter
    /// how the collection is mutated between additions.
    #[test]
    fn ids_never_repeat(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut set = LayoutSet::new(Vocabulary::from_names(&NAMES).unwrap());
        let mut seen = Vec::new();
        for op in ops {
            match op {
                Op::Add(i) => { set.add(NAMES[i]).unwrap(); }
                Op::Delete(i) => { set.delete(i); }
                Op::DeleteAll => { set.delete_all(); }
                Op::MergeImport(labels) => { set.import(&serialized(&labels), false).unwrap(); }
                Op::ReplaceImport(labels) => { set.import(&serialized(&labels), true).unwrap(); }
            }
            for record in set.records() {
                if !seen.contains(&record.id) {
                    seen.push(record.id);
                }
            }
        }
        let mut sorted = seen.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), seen.len());
    }

    /// Property: importing the same set twice with replacement yields equal
    /// sizes and equal per-category counts both times.
    #[test]
    fn replace_import_idempotent(labels in prop::collection::vec(0u32..NAMES.len() as u32, 1..12)) {
        let mut set = LayoutSet::new(Vocabulary::from_names(&NAMES).unwrap());
        let incoming = serialized(&labels);

        let first = set.import(&incoming, true).unwrap();
        let counts_first = set.named_counts();
        let second = set.import(&incoming, true).unwrap();

        prop_assert_eq!(first.total, second.total);
        prop_assert_eq!(counts_first, set.named_counts());
    }
}
