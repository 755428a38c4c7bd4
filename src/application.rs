//! Application layer module
//!
//! Use cases that orchestrate the domain and the network services: image
//! resolution, row enrichment, export and the review session.

pub mod enrichment;
pub mod export;
pub mod image_resolver;
pub mod review;

pub use enrichment::{EnrichedRow, EnrichmentReport, PrimaryImage, RowEnrichmentPass, SecondaryImage};
pub use export::{ExportComposer, ExportTable, MATCH_COLUMN};
pub use image_resolver::ImageResolver;
pub use review::{ReviewError, ReviewServices, ReviewSession, ReviewStatus};
