//! Property-based tests for the lifetime algebra.
//!
//! Random mutation scripts are driven through a mutable source and an
//! operator chain; every observed output stream must carry well-formed
//! lifetimes, and the reconstructed membership must match the operator's
//! declarative meaning.

mod common;

use std::collections::HashMap;

use common::Recorder;
use proptest::prelude::*;
use rill_core::Membership;
use rill_sets::{ChangeBatch, MutableSet, SetExt};

/// One scripted mutation against a keyed source.
#[derive(Clone, Debug)]
enum Op {
    Upsert(i64, i64),
    Remove(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..8, -1000i64..1000).prop_map(|(key, value)| Op::Upsert(key, value)),
        (0i64..8).prop_map(Op::Remove),
    ]
}

fn script_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 0..60)
}

/// Applies the script, mirroring it into a model map.
fn drive(source: &MutableSet<(i64, i64), i64>, script: &[Op], model: &mut HashMap<i64, i64>) {
    for op in script {
        match op {
            Op::Upsert(key, value) => {
                if model.insert(*key, *value).is_some() {
                    source.update((*key, *value)).unwrap();
                } else {
                    source.add((*key, *value)).unwrap();
                }
            }
            Op::Remove(key) => {
                if model.remove(key).is_some() {
                    source.delete(key).unwrap();
                }
            }
        }
    }
}

/// Replays recorded batches through a fresh membership, failing the test on
/// any lifetime-algebra violation.
fn assert_well_formed<T: Clone>(batches: &[ChangeBatch<T>]) -> Membership<T> {
    let mut membership = Membership::new();
    for batch in batches {
        assert!(!batch.is_empty(), "operators never emit empty batches");
        membership
            .apply(batch)
            .expect("output stream violated the lifetime algebra");
    }
    membership
}

proptest! {
    /// Every output stream of a filter/map chain carries well-formed
    /// lifetimes, and filter membership equals the predicate applied to the
    /// model.
    #[test]
    fn filter_map_chain_is_well_formed(script in script_strategy()) {
        let source: MutableSet<(i64, i64), i64> = MutableSet::new(|(key, _): &(i64, i64)| *key);
        let filtered = source.handle().filter(|(_, value)| value % 2 == 0);
        let mapped = filtered.map(|(key, value)| (*key, value * 3));

        let source_rec = Recorder::attach(&source.handle());
        let filter_rec = Recorder::attach(&filtered);
        let map_rec = Recorder::attach(&mapped);

        let mut model = HashMap::new();
        drive(&source, &script, &mut model);

        let source_members = assert_well_formed(&source_rec.batches());
        let filter_members = assert_well_formed(&filter_rec.batches());
        let map_members = assert_well_formed(&map_rec.batches());

        let mut expected_source: Vec<(i64, i64)> = model.iter().map(|(k, v)| (*k, *v)).collect();
        expected_source.sort_unstable();
        let mut actual_source = source_members.values();
        actual_source.sort_unstable();
        prop_assert_eq!(expected_source, actual_source);

        let mut expected_filter: Vec<(i64, i64)> =
            model.iter().filter(|(_, v)| *v % 2 == 0).map(|(k, v)| (*k, *v)).collect();
        expected_filter.sort_unstable();
        let mut actual_filter = filter_members.values();
        actual_filter.sort_unstable();
        prop_assert_eq!(expected_filter.clone(), actual_filter);

        let mut expected_map: Vec<(i64, i64)> =
            expected_filter.into_iter().map(|(k, v)| (k, v * 3)).collect();
        expected_map.sort_unstable();
        let mut actual_map = map_members.values();
        actual_map.sort_unstable();
        prop_assert_eq!(expected_map, actual_map);
    }

    /// Join output is well-formed and equals the declarative join of the
    /// two model maps.
    #[test]
    fn join_output_is_well_formed(
        left_script in script_strategy(),
        right_script in script_strategy(),
    ) {
        let left: MutableSet<(i64, i64), i64> = MutableSet::new(|(key, _): &(i64, i64)| *key);
        let right: MutableSet<(i64, i64), i64> = MutableSet::new(|(key, _): &(i64, i64)| *key);
        let joined = left.handle().join(
            &right.handle(),
            |(_, lv): &(i64, i64)| lv % 4,
            |(_, rv): &(i64, i64)| rv % 4,
            |l, r| (*l, *r),
        );
        let join_rec = Recorder::attach(&joined);

        let mut left_model = HashMap::new();
        let mut right_model = HashMap::new();

        // Interleave the two scripts to exercise both batch directions.
        let mut left_ops = left_script.iter();
        let mut right_ops = right_script.iter();
        loop {
            let l = left_ops.next();
            if let Some(op) = l {
                drive(&left, core::slice::from_ref(op), &mut left_model);
            }
            let r = right_ops.next();
            if let Some(op) = r {
                drive(&right, core::slice::from_ref(op), &mut right_model);
            }
            if l.is_none() && r.is_none() {
                break;
            }
        }

        let join_members = assert_well_formed(&join_rec.batches());

        let mut expected: Vec<((i64, i64), (i64, i64))> = Vec::new();
        for lv in left_model.iter().map(|(k, v)| (*k, *v)) {
            for rv in right_model.iter().map(|(k, v)| (*k, *v)) {
                if lv.1 % 4 == rv.1 % 4 {
                    expected.push((lv, rv));
                }
            }
        }
        expected.sort_unstable();
        let mut actual = join_members.values();
        actual.sort_unstable();
        prop_assert_eq!(expected, actual);
    }
}
