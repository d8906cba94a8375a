//! Baseline/draft bookkeeping for one catalog list.
//!
//! The session holds the last server-confirmed rows and, while editing, a
//! working copy. Only one draft exists at a time; entering edit mode twice
//! is impossible because the draft is an `Option`.

use crate::catalog::{CellValue, NumericColumn, ObjectRecord};
use crate::diff::{diff, Patch};
use crate::error::CoreError;

#[derive(Debug, Clone, Default)]
pub struct EditSession {
    list_name: Option<String>,
    baseline: Vec<ObjectRecord>,
    draft: Option<Vec<ObjectRecord>>,
}

impl EditSession {
    pub fn new(list_name: impl Into<String>, rows: Vec<ObjectRecord>) -> Self {
        Self {
            list_name: Some(list_name.into()),
            baseline: rows,
            draft: None,
        }
    }

    pub fn list_name(&self) -> Option<&str> {
        self.list_name.as_deref()
    }

    pub fn baseline(&self) -> &[ObjectRecord] {
        &self.baseline
    }

    pub fn draft(&self) -> Option<&[ObjectRecord]> {
        self.draft.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// Replace the baseline with freshly loaded rows, dropping any draft.
    pub fn load(&mut self, list_name: impl Into<String>, rows: Vec<ObjectRecord>) {
        self.list_name = Some(list_name.into());
        self.baseline = rows;
        self.draft = None;
    }

    /// Enter edit mode with a snapshot of the baseline, or leave it and
    /// discard the draft. Returns whether the session is now editing.
    pub fn toggle(&mut self) -> bool {
        if self.draft.take().is_none() {
            self.draft = Some(self.baseline.clone());
        }
        self.is_editing()
    }

    /// Set one numeric cell of the draft.
    pub fn edit_cell(
        &mut self,
        row: usize,
        column: NumericColumn,
        value: CellValue,
    ) -> Result<(), CoreError> {
        let draft = self.draft_mut()?;
        let len = draft.len();
        let record = draft.get_mut(row).ok_or_else(|| CoreError::NotFound {
            entity: "draft row",
            key: format!("{row} (of {len})"),
        })?;
        *record.value_mut(column) = value;
        Ok(())
    }

    /// Replace the whole draft, e.g. with rows edited outside the session.
    pub fn replace_draft(&mut self, rows: Vec<ObjectRecord>) -> Result<(), CoreError> {
        *self.draft_mut()? = rows;
        Ok(())
    }

    /// Patches that would bring the remote list in line with the draft.
    pub fn pending_patches(&self, user_id: &str) -> Result<Vec<Patch>, CoreError> {
        let list_name = self
            .list_name
            .as_deref()
            .ok_or_else(|| CoreError::Validation("no catalog list is loaded".into()))?;
        let draft = self
            .draft
            .as_deref()
            .ok_or_else(|| CoreError::Validation("not editing".into()))?;
        Ok(diff(
            &self.baseline,
            draft,
            &NumericColumn::ALL,
            list_name,
            user_id,
        ))
    }

    /// Accept the draft: the coerced draft becomes the new baseline and
    /// edit mode ends. Returns the new baseline.
    pub fn commit(&mut self) -> Result<&[ObjectRecord], CoreError> {
        let draft = self
            .draft
            .take()
            .ok_or_else(|| CoreError::Validation("not editing".into()))?;
        self.baseline = draft.iter().map(ObjectRecord::coerced).collect();
        Ok(&self.baseline)
    }

    fn draft_mut(&mut self) -> Result<&mut Vec<ObjectRecord>, CoreError> {
        self.draft
            .as_mut()
            .ok_or_else(|| CoreError::Validation("not editing".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn session() -> EditSession {
        EditSession::new(
            "targets",
            vec![
                ObjectRecord::named("obj1")
                    .with(NumericColumn::Priority, "3"),
                ObjectRecord::named("obj2")
                    .with(NumericColumn::Priority, 1.0),
            ],
        )
    }

    #[test]
    fn toggle_snapshots_then_discards() {
        let mut s = session();
        assert!(s.toggle());
        s.edit_cell(0, NumericColumn::Priority, "9".into()).unwrap();
        assert_eq!(s.draft().unwrap()[0].priority, CellValue::from("9"));

        assert!(!s.toggle());
        assert!(s.draft().is_none());
        assert_eq!(s.baseline()[0].priority, CellValue::from("3"));

        // Re-entering starts from the untouched baseline.
        s.toggle();
        assert_eq!(s.draft().unwrap()[0].priority, CellValue::from("3"));
    }

    #[test]
    fn edits_require_edit_mode() {
        let mut s = session();
        assert_matches!(
            s.edit_cell(0, NumericColumn::ALen, 1.0.into()),
            Err(CoreError::Validation(_))
        );
        assert_matches!(s.pending_patches("u"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn out_of_range_row_is_not_found() {
        let mut s = session();
        s.toggle();
        assert_matches!(
            s.edit_cell(5, NumericColumn::ALen, 1.0.into()),
            Err(CoreError::NotFound { entity: "draft row", .. })
        );
    }

    #[test]
    fn pending_patches_reflect_draft_changes() {
        let mut s = session();
        s.toggle();
        s.edit_cell(0, NumericColumn::Priority, "5".into()).unwrap();

        let patches = s.pending_patches("observer1").unwrap();

        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].list_name, "targets");
        assert_eq!(patches[0].user_id, "observer1");
        assert_eq!(
            patches[0].changes()[&NumericColumn::Priority],
            CellValue::Number(5.0)
        );
    }

    #[test]
    fn commit_replaces_baseline_with_coerced_draft() {
        let mut s = session();
        s.toggle();
        let edited = CellValue::from(" 5 ");
        s.edit_cell(0, NumericColumn::Priority, edited).unwrap();

        let baseline = s.commit().unwrap();
        assert_eq!(baseline[0].priority, CellValue::Number(5.0));
        assert!(!s.is_editing());
        assert!(s.pending_patches("u").is_err());
    }

    #[test]
    fn load_drops_draft() {
        let mut s = session();
        s.toggle();
        s.load("other", vec![]);
        assert!(!s.is_editing());
        assert_eq!(s.list_name(), Some("other"));
        assert!(s.baseline().is_empty());
    }

    #[test]
    fn patches_need_a_list_name() {
        let mut s = EditSession::default();
        s.toggle();
        assert_matches!(s.pending_patches("u"), Err(CoreError::Validation(_)));
    }
}
