//! Domain module - table, judgments, pagination and session state
//!
//! Each module is its own file in the domain/ directory; commonly used
//! items are re-exported here for convenience.

pub mod judgment;
pub mod pagination;
pub mod session;
pub mod table;

pub use judgment::JudgmentStore;
pub use pagination::Pagination;
pub use session::{Session, SessionError};
pub use table::{ColumnSelection, Row, RowId, SourceTable};
