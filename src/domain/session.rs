//! Review session state
//!
//! A session is scoped to one loaded table and owns its judgments. Loading a new
//! table or resetting clears every judgment; the resolution cache lives outside the
//! session and survives both.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::judgment::JudgmentStore;
use crate::domain::table::{RowId, SourceTable};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Row {row_id} is outside the loaded table ({row_count} rows)")]
    RowOutOfRange { row_id: RowId, row_count: usize },
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    loaded_at: DateTime<Utc>,
    table: SourceTable,
    judgments: JudgmentStore,
}

impl Session {
    pub fn new(table: SourceTable) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            table,
            judgments: JudgmentStore::new(),
        };
        info!(
            "📋 Session {} started: {} rows, {} columns",
            session.id,
            session.table.row_count(),
            session.table.column_count()
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn table(&self) -> &SourceTable {
        &self.table
    }

    pub fn judgments(&self) -> &JudgmentStore {
        &self.judgments
    }

    /// Swap in a new table; judgments from the previous table are discarded
    pub fn replace_table(&mut self, table: SourceTable) {
        self.table = table;
        self.judgments.reset_all();
        self.loaded_at = Utc::now();
        info!(
            "📋 Session {} reloaded: {} rows",
            self.id,
            self.table.row_count()
        );
    }

    fn check_range(&self, row_id: RowId) -> Result<(), SessionError> {
        let row_count = self.table.row_count();
        if row_id < row_count {
            Ok(())
        } else {
            Err(SessionError::RowOutOfRange { row_id, row_count })
        }
    }

    pub fn set_judgment(&mut self, row_id: RowId, value: bool) -> Result<(), SessionError> {
        self.check_range(row_id)?;
        self.judgments.set(row_id, value);
        Ok(())
    }

    pub fn toggle_judgment(&mut self, row_id: RowId) -> Result<bool, SessionError> {
        self.check_range(row_id)?;
        Ok(self.judgments.toggle(row_id))
    }

    pub fn reset_judgments(&mut self) {
        info!(
            "Session {}: clearing {} judgments",
            self.id,
            self.judgments.recorded_count()
        );
        self.judgments.reset_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> SourceTable {
        SourceTable::new(
            vec!["a".into()],
            (0..rows).map(|i| vec![Some(i.to_string())]).collect(),
        )
    }

    #[test]
    fn judgments_outside_the_table_are_rejected() {
        let mut session = Session::new(table(3));
        assert!(session.set_judgment(2, true).is_ok());
        assert_eq!(
            session.set_judgment(3, true),
            Err(SessionError::RowOutOfRange { row_id: 3, row_count: 3 })
        );
        assert_eq!(session.judgments().recorded_count(), 1);
    }

    #[test]
    fn replacing_the_table_clears_judgments() {
        let mut session = Session::new(table(10));
        session.set_judgment(9, true).unwrap();
        session.replace_table(table(2));
        assert!(!session.judgments().get(9));
        assert_eq!(session.judgments().recorded_count(), 0);
    }
}
