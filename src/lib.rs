//! Catalog Matcher - side-by-side product image review for CSV catalogs
//!
//! Loads a product table, resolves a primary image for each row from its product
//! page metadata (or a direct image column), downloads it next to the secondary
//! image, and records the operator's match decisions as a `MATCH` column on export.

// Module declarations
pub mod application;
pub mod commands;
pub mod domain;
pub mod infrastructure;

pub use application::{ReviewServices, ReviewSession};
pub use domain::{ColumnSelection, SourceTable};
pub use infrastructure::AppConfig;
