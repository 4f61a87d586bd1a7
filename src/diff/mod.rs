//! Settings diff engine.
//!
//! Pure reconciliation between the previously applied configuration
//! snapshot and the currently desired one. The output decides what - if
//! anything - gets pushed into the grid engine: nothing, a targeted update
//! for the changed keys only, or a full settings replace.
//!
//! A partial update is strongly preferred because a full replace can reset
//! engine-side state (scroll position, selection, cached layouts).
//!
//! The engine never fails: unrecognized option values fall back to
//! reference equality, and malformed row collections fall back to plain
//! value comparison.

mod policy;

pub use policy::{OptionFlags, OptionPolicy};

use std::collections::BTreeSet;

use crate::types::{AppliedSnapshot, DiffResult, RowShape, Rows, SettingValue, SettingsMap};

/// Compare the previously applied snapshot against the desired one and
/// produce exactly one [`DiffResult`].
///
/// `previous = None` means the engine has never been configured: the whole
/// desired snapshot is applied.
pub fn reconcile(
    previous: Option<&AppliedSnapshot>,
    desired: &SettingsMap,
    policy: &OptionPolicy,
) -> DiffResult {
    let Some(previous) = previous else {
        return DiffResult::FullReplace {
            values: desired.clone(),
        };
    };
    let applied = &previous.settings;

    // Clearing the entire configuration is a replace, not a pile of
    // removals.
    if desired.is_empty() {
        if applied.is_empty() {
            return DiffResult::NoChange;
        }
        return DiffResult::FullReplace {
            values: SettingsMap::new(),
        };
    }

    let mut changed_keys: BTreeSet<String> = BTreeSet::new();
    let mut values = SettingsMap::new();

    for key in applied.union_keys(desired) {
        match (applied.get(&key), desired.get(&key)) {
            (Some(old), Some(new)) if policy.is_row_data(&key) => {
                if row_data_changed(previous.row_shape.as_ref(), old, new) {
                    values.insert(key.clone(), new.clone());
                    changed_keys.insert(key);
                }
            }
            (Some(old), Some(new)) => {
                if old != new {
                    values.insert(key.clone(), new.clone());
                    changed_keys.insert(key);
                }
            }
            (None, Some(new)) => {
                values.insert(key.clone(), new.clone());
                changed_keys.insert(key);
            }
            (Some(_), None) => {
                // Sticky options persist once set; everything else is a
                // removal, listed in changed_keys with no value entry.
                if !policy.is_sticky(&key) {
                    changed_keys.insert(key);
                }
            }
            (None, None) => unreachable!("key came from the union of both snapshots"),
        }
    }

    if changed_keys.is_empty() {
        return DiffResult::NoChange;
    }

    if changed_keys.iter().any(|key| policy.forces_full_reload(key)) {
        return DiffResult::FullReplace {
            values: desired.clone(),
        };
    }

    DiffResult::PartialUpdate {
        changed_keys,
        values,
    }
}

/// The row-collection shape heuristic.
///
/// The backing storage is commonly mutated in place by the owning
/// application, so the desired collection is compared against the shape
/// *tracked* at the last apply rather than against the previous `Rc` (which
/// usually aliases the very same storage).
///
/// - Matrices are pass-through: the grid views the same backing storage, so
///   pushes, pops, and in-place edits reach it without a settings update.
/// - Record lists change only when a record's property-name count diverges
///   from its tracked predecessor. Appended or removed records alone are
///   pass-through as well.
/// - A kind flip between the two shapes is always a change.
///
/// Known limitation, preserved on purpose: a record that changes property
/// *values* without changing its property count is not detected here.
/// Downstream code relies on those edits flowing through the shared storage
/// instead of a settings update.
fn row_data_changed(
    tracked: Option<&RowShape>,
    old: &SettingValue,
    new: &SettingValue,
) -> bool {
    let (SettingValue::Rows(_), SettingValue::Rows(new_rows)) = (old, new) else {
        // Not actually row collections - compare like any other option.
        return old != new;
    };

    match (&*new_rows.borrow(), tracked) {
        (Rows::Matrix(_), Some(RowShape::Matrix)) => false,
        (Rows::Records(records), Some(RowShape::Records { field_counts })) => records
            .iter()
            .zip(field_counts)
            .any(|(record, tracked_count)| record.field_count() != *tracked_count),
        // Kind flip, or no shape was tracked for the previous apply.
        _ => true,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{shared_rows, CellValue, Record};
    use proptest::prelude::*;

    fn applied(settings: SettingsMap, policy: &OptionPolicy) -> AppliedSnapshot {
        AppliedSnapshot::capture(settings, policy.row_data_key())
    }

    fn changed_keys(result: &DiffResult) -> Vec<String> {
        match result {
            DiffResult::PartialUpdate { changed_keys, .. } => {
                changed_keys.iter().cloned().collect()
            }
            other => panic!("expected PartialUpdate, got {other:?}"),
        }
    }

    #[test]
    fn first_reconciliation_is_a_full_replace() {
        let desired: SettingsMap = [("rowHeaders", true)].into_iter().collect();
        let result = reconcile(None, &desired, &OptionPolicy::standard());
        assert_eq!(
            result,
            DiffResult::FullReplace {
                values: desired.clone()
            }
        );
    }

    #[test]
    fn identical_snapshots_are_no_change() {
        let policy = OptionPolicy::standard();
        let snapshot: SettingsMap = [
            ("rowHeaders", SettingValue::Bool(true)),
            ("colHeaders", SettingValue::Bool(false)),
        ]
        .into_iter()
        .collect();
        let result = reconcile(Some(&applied(snapshot.clone(), &policy)), &snapshot, &policy);
        assert_eq!(result, DiffResult::NoChange);
    }

    #[test]
    fn single_option_change_is_minimal() {
        let policy = OptionPolicy::standard();
        let prev: SettingsMap = [("rowHeaders", true)].into_iter().collect();
        let next: SettingsMap = [("rowHeaders", false)].into_iter().collect();
        let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
        match &result {
            DiffResult::PartialUpdate {
                changed_keys,
                values,
            } => {
                assert_eq!(changed_keys.len(), 1);
                assert!(changed_keys.contains("rowHeaders"));
                assert_eq!(values.get("rowHeaders"), Some(&SettingValue::Bool(false)));
                assert_eq!(values.len(), 1);
            }
            other => panic!("expected PartialUpdate, got {other:?}"),
        }
    }

    #[test]
    fn added_option_is_a_change() {
        let policy = OptionPolicy::standard();
        let prev: SettingsMap = [("rowHeaders", true)].into_iter().collect();
        let next: SettingsMap = [("rowHeaders", true), ("readOnly", true)]
            .into_iter()
            .collect();
        let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
        assert_eq!(changed_keys(&result), vec!["readOnly".to_string()]);
    }

    #[test]
    fn removed_option_is_listed_without_a_value() {
        let policy = OptionPolicy::standard();
        let prev: SettingsMap = [("rowHeaders", true), ("readOnly", true)]
            .into_iter()
            .collect();
        let next: SettingsMap = [("rowHeaders", true)].into_iter().collect();
        let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
        match &result {
            DiffResult::PartialUpdate {
                changed_keys,
                values,
            } => {
                assert!(changed_keys.contains("readOnly"));
                assert!(!values.contains("readOnly"));
            }
            other => panic!("expected PartialUpdate, got {other:?}"),
        }
    }

    #[test]
    fn sticky_option_is_retained_not_removed() {
        let policy = OptionPolicy::standard().with("licenseKey", OptionFlags::STICKY);
        let prev: SettingsMap = [("licenseKey", "evaluation")].into_iter().collect();
        let next = SettingsMap::new();
        // Empty-desired edge case takes priority over stickiness when the
        // whole configuration is cleared.
        let result = reconcile(Some(&applied(prev.clone(), &policy)), &next, &policy);
        assert_eq!(
            result,
            DiffResult::FullReplace {
                values: SettingsMap::new()
            }
        );

        // With anything else desired, the sticky key is simply retained.
        let next: SettingsMap = [("rowHeaders", true)].into_iter().collect();
        let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
        assert_eq!(changed_keys(&result), vec!["rowHeaders".to_string()]);
    }

    #[test]
    fn explicit_null_differs_from_absence() {
        let policy = OptionPolicy::standard();
        let prev: SettingsMap = [("placeholder", SettingValue::Null)].into_iter().collect();
        let next: SettingsMap = [("placeholder", SettingValue::Null)].into_iter().collect();
        assert_eq!(
            reconcile(Some(&applied(prev.clone(), &policy)), &next, &policy),
            DiffResult::NoChange
        );

        let next: SettingsMap = [("other", true)].into_iter().collect();
        let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
        let keys = changed_keys(&result);
        assert!(keys.contains(&"placeholder".to_string()));
        assert!(keys.contains(&"other".to_string()));
    }

    #[test]
    fn full_reload_flag_escalates_to_full_replace() {
        let policy = OptionPolicy::standard().with("columns", OptionFlags::FULL_RELOAD);
        let prev: SettingsMap = [
            ("columns", SettingValue::Int(2)),
            ("rowHeaders", SettingValue::Bool(true)),
        ]
        .into_iter()
        .collect();
        let next: SettingsMap = [
            ("columns", SettingValue::Int(3)),
            ("rowHeaders", SettingValue::Bool(true)),
        ]
        .into_iter()
        .collect();
        let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
        assert_eq!(
            result,
            DiffResult::FullReplace {
                values: next.clone()
            }
        );
    }

    // -------------------------------------------------------------------------
    // Row-data heuristic
    // -------------------------------------------------------------------------

    #[test]
    fn matrix_mutations_are_pass_through() {
        let policy = OptionPolicy::standard();
        let rows = shared_rows(Rows::Matrix(vec![vec![CellValue::Int(1)]]));
        let prev: SettingsMap = [("data", rows.clone())].into_iter().collect();
        let snapshot = applied(prev.clone(), &policy);

        // In-place push, pop, and edit - same reference.
        if let Rows::Matrix(matrix) = &mut *rows.borrow_mut() {
            matrix.push(vec![CellValue::Int(2)]);
            matrix[0][0] = CellValue::Int(99);
        }
        assert_eq!(
            reconcile(Some(&snapshot), &prev, &policy),
            DiffResult::NoChange
        );

        // Even a brand-new matrix reference is pass-through.
        let replaced = shared_rows(Rows::Matrix(vec![vec![CellValue::Int(5)]]));
        let next: SettingsMap = [("data", replaced)].into_iter().collect();
        assert_eq!(
            reconcile(Some(&snapshot), &next, &policy),
            DiffResult::NoChange
        );
    }

    #[test]
    fn record_property_count_growth_is_a_change() {
        let policy = OptionPolicy::standard();
        let rows = shared_rows(Rows::Records(vec![Record::from_iter([
            ("a", 1i64),
            ("b", 2i64),
            ("c", 3i64),
        ])]));
        let prev: SettingsMap = [("data", rows.clone())].into_iter().collect();
        let snapshot = applied(prev.clone(), &policy);

        // Replace row 0 in place with a wider record - same collection
        // reference, different shape.
        if let Rows::Records(records) = &mut *rows.borrow_mut() {
            records[0] = Record::from_iter([("a", 1i64), ("b", 2i64), ("c", 3i64), ("d", 4i64)]);
        }

        let result = reconcile(Some(&snapshot), &prev, &policy);
        match &result {
            DiffResult::PartialUpdate {
                changed_keys,
                values,
            } => {
                assert_eq!(changed_keys.len(), 1);
                assert!(changed_keys.contains("data"));
                // The full new collection rides along.
                assert_eq!(values.get("data"), prev.get("data"));
            }
            other => panic!("expected PartialUpdate, got {other:?}"),
        }
    }

    #[test]
    fn record_property_count_shrink_is_a_change() {
        let policy = OptionPolicy::standard();
        let rows = shared_rows(Rows::Records(vec![Record::from_iter([
            ("a", 1i64),
            ("b", 2i64),
        ])]));
        let prev: SettingsMap = [("data", rows.clone())].into_iter().collect();
        let snapshot = applied(prev.clone(), &policy);

        if let Rows::Records(records) = &mut *rows.borrow_mut() {
            records[0] = Record::from_iter([("a", 1i64)]);
        }

        let result = reconcile(Some(&snapshot), &prev, &policy);
        assert_eq!(changed_keys(&result), vec!["data".to_string()]);
    }

    #[test]
    fn record_append_and_remove_are_pass_through() {
        let policy = OptionPolicy::standard();
        let rows = shared_rows(Rows::Records(vec![Record::from_iter([
            ("a", 1i64),
            ("b", 2i64),
            ("c", 3i64),
        ])]));
        let prev: SettingsMap = [("data", rows.clone())].into_iter().collect();
        let snapshot = applied(prev.clone(), &policy);

        if let Rows::Records(records) = &mut *rows.borrow_mut() {
            records.push(Record::from_iter([("a", 12i64), ("b", 22i64), ("c", 32i64)]));
        }
        assert_eq!(
            reconcile(Some(&snapshot), &prev, &policy),
            DiffResult::NoChange
        );

        if let Rows::Records(records) = &mut *rows.borrow_mut() {
            records.pop();
        }
        assert_eq!(
            reconcile(Some(&snapshot), &prev, &policy),
            DiffResult::NoChange
        );
    }

    #[test]
    fn same_shape_new_reference_is_pass_through() {
        let policy = OptionPolicy::standard();
        let prev_rows = shared_rows(Rows::Records(vec![Record::from_iter([
            ("a", 1i64),
            ("b", 2i64),
        ])]));
        let prev: SettingsMap = [("data", prev_rows)].into_iter().collect();
        let snapshot = applied(prev, &policy);

        let next_rows = shared_rows(Rows::Records(vec![Record::from_iter([
            ("a", 7i64),
            ("b", 8i64),
        ])]));
        let next: SettingsMap = [("data", next_rows)].into_iter().collect();
        assert_eq!(
            reconcile(Some(&snapshot), &next, &policy),
            DiffResult::NoChange
        );
    }

    #[test]
    fn shape_kind_flip_is_a_change() {
        let policy = OptionPolicy::standard();
        let prev_rows = shared_rows(Rows::Matrix(vec![vec![CellValue::Int(1)]]));
        let prev: SettingsMap = [("data", prev_rows)].into_iter().collect();
        let snapshot = applied(prev, &policy);

        let next_rows = shared_rows(Rows::Records(vec![Record::from_iter([("a", 1i64)])]));
        let next: SettingsMap = [("data", next_rows)].into_iter().collect();
        let result = reconcile(Some(&snapshot), &next, &policy);
        assert_eq!(changed_keys(&result), vec!["data".to_string()]);
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    fn scalar_value() -> impl Strategy<Value = SettingValue> {
        prop_oneof![
            Just(SettingValue::Null),
            any::<bool>().prop_map(SettingValue::Bool),
            any::<i64>().prop_map(SettingValue::Int),
            "[a-z]{0,12}".prop_map(SettingValue::from),
        ]
    }

    fn scalar_snapshot() -> impl Strategy<Value = SettingsMap> {
        proptest::collection::hash_map("[a-m]{1,6}", scalar_value(), 0..8)
            .prop_map(|entries| entries.into_iter().collect())
    }

    proptest! {
        #[test]
        fn reconcile_is_idempotent(snapshot in scalar_snapshot()) {
            let policy = OptionPolicy::standard();
            let prev = applied(snapshot.clone(), &policy);
            prop_assert_eq!(
                reconcile(Some(&prev), &snapshot, &policy),
                DiffResult::NoChange
            );
        }

        #[test]
        fn first_call_is_total(snapshot in scalar_snapshot()) {
            let policy = OptionPolicy::standard();
            let result = reconcile(None, &snapshot, &policy);
            prop_assert_eq!(result, DiffResult::FullReplace { values: snapshot });
        }

        #[test]
        fn single_key_perturbation_is_minimal(
            base in scalar_snapshot(),
            old in scalar_value(),
            new in scalar_value(),
        ) {
            prop_assume!(old != new);
            let policy = OptionPolicy::standard();
            // "zz" is outside the generated key alphabet.
            let mut prev = base.clone();
            prev.insert("zz", old);
            let mut next = base;
            next.insert("zz", new.clone());

            let result = reconcile(Some(&applied(prev, &policy)), &next, &policy);
            match result {
                DiffResult::PartialUpdate { changed_keys, values } => {
                    prop_assert_eq!(changed_keys.len(), 1);
                    prop_assert!(changed_keys.contains("zz"));
                    prop_assert_eq!(values.get("zz"), Some(&new));
                }
                other => prop_assert!(false, "expected PartialUpdate, got {:?}", other),
            }
        }
    }
}
