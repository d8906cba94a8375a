//! Row-by-row edit detection between a baseline catalog list and its
//! edited draft, producing minimal per-object update patches.
//!
//! Rows are paired by index. For each tracked column both sides are
//! coerced with [`coerce_for_column`] and compared with strict equality:
//! numbers compare as IEEE-754 values (so `NaN` never equals `NaN`), text
//! compares byte-for-byte, and a number never equals text.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{coerce_for_column, CellValue, NumericColumn, ObjectRecord};

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Update for exactly one catalog object, carrying only the columns that
/// changed. Serializes flat: `{list_name, obj_name, user_id, <column>: value}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub list_name: String,
    pub obj_name: String,
    pub user_id: String,
    #[serde(flatten)]
    changes: BTreeMap<NumericColumn, CellValue>,
}

impl Patch {
    /// Returns `None` when `changes` is empty; an empty patch is never
    /// built.
    pub fn new(
        list_name: impl Into<String>,
        obj_name: impl Into<String>,
        user_id: impl Into<String>,
        changes: BTreeMap<NumericColumn, CellValue>,
    ) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        Some(Self {
            list_name: list_name.into(),
            obj_name: obj_name.into(),
            user_id: user_id.into(),
            changes,
        })
    }

    pub fn changes(&self) -> &BTreeMap<NumericColumn, CellValue> {
        &self.changes
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Strict equality of two coerced cells.
pub fn cells_equal(before: &CellValue, after: &CellValue) -> bool {
    before == after
}

/// Tracked columns of `after` that differ from `before`, with their
/// coerced new values. A missing baseline row compares as all-null.
pub fn changed_columns(
    before: Option<&ObjectRecord>,
    after: &ObjectRecord,
    tracked: &[NumericColumn],
) -> BTreeMap<NumericColumn, CellValue> {
    let mut changes = BTreeMap::new();
    for &column in tracked {
        let old = before
            .map(|row| coerce_for_column(column, row.value(column)))
            .unwrap_or_default();
        let new = coerce_for_column(column, after.value(column));
        if !cells_equal(&old, &new) {
            changes.insert(column, new);
        }
    }
    changes
}

/// Compute the patches that bring the remote list from `baseline` to
/// `draft`. Output order follows draft row order; rows without changes
/// produce nothing.
pub fn diff(
    baseline: &[ObjectRecord],
    draft: &[ObjectRecord],
    tracked: &[NumericColumn],
    list_name: &str,
    user_id: &str,
) -> Vec<Patch> {
    draft
        .iter()
        .enumerate()
        .filter_map(|(i, after)| {
            let changes = changed_columns(baseline.get(i), after, tracked);
            Patch::new(list_name, after.name.as_str(), user_id, changes)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
