//! Operator match judgments
//!
//! Sparse map from row identity to the operator's decision. A row that was never
//! judged reads as `false`; there is no "unknown" state.

use std::collections::BTreeMap;

use crate::domain::table::RowId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JudgmentStore {
    entries: BTreeMap<RowId, bool>,
}

impl JudgmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision; the last write wins
    pub fn set(&mut self, row_id: RowId, value: bool) {
        self.entries.insert(row_id, value);
    }

    pub fn get(&self, row_id: RowId) -> bool {
        self.entries.get(&row_id).copied().unwrap_or(false)
    }

    /// Flip the decision for a row and return the new value
    pub fn toggle(&mut self, row_id: RowId) -> bool {
        let value = !self.get(row_id);
        self.set(row_id, value);
        value
    }

    pub fn reset_all(&mut self) {
        self.entries.clear();
    }

    /// Rows currently marked as a match
    pub fn matched_count(&self) -> usize {
        self.entries.values().filter(|v| **v).count()
    }

    /// Rows with an explicit entry, matched or not
    pub fn recorded_count(&self) -> usize {
        self.entries.len()
    }

    pub fn matched_rows(&self) -> impl Iterator<Item = RowId> + '_ {
        self.entries
            .iter()
            .filter_map(|(id, matched)| matched.then_some(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_rows_read_false() {
        let store = JudgmentStore::new();
        assert!(!store.get(0));
        assert!(!store.get(usize::MAX));
    }

    #[test]
    fn last_write_wins() {
        let mut store = JudgmentStore::new();
        store.set(5, true);
        store.set(5, false);
        assert!(!store.get(5));
        assert_eq!(store.matched_count(), 0);
        assert_eq!(store.recorded_count(), 1);
    }

    #[test]
    fn toggle_and_reset() {
        let mut store = JudgmentStore::new();
        assert!(store.toggle(3));
        assert!(store.toggle(7));
        assert!(!store.toggle(3));
        assert_eq!(store.matched_rows().collect::<Vec<_>>(), vec![7]);

        store.reset_all();
        assert!(!store.get(7));
        assert_eq!(store.recorded_count(), 0);
    }
}
