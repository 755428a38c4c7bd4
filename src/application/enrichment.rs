//! Row enrichment pass
//!
//! Turns an ordered set of rows into display-ready records: resolved image bytes
//! for both sides, the selected detail columns and the current judgment. Rows are
//! processed one after another. No failure aborts the pass; a missing image is
//! reported through the row outcome.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::application::image_resolver::ImageResolver;
use crate::domain::judgment::JudgmentStore;
use crate::domain::table::{ColumnSelection, Row, RowId, SourceTable};
use crate::infrastructure::image_retriever::ImageSource;
use crate::infrastructure::resolution_cache::{CacheKind, CachedValue, ResolutionCache};

/// Primary side of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryImage {
    Ready { url: String, bytes: Arc<[u8]> },
    /// A URL was resolved but no bytes could be downloaded
    NotDownloadable { url: String },
    /// Neither the direct field nor the page metadata produced a URL
    NotFound,
}

/// Secondary side of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryImage {
    Ready { url: String, bytes: Arc<[u8]> },
    NotDownloadable { url: String },
    /// The secondary image field is blank
    MissingUrl,
}

impl PrimaryImage {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Ready { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::NotDownloadable { .. } => "not downloadable",
            Self::NotFound => "not found",
        }
    }
}

impl SecondaryImage {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Ready { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::NotDownloadable { .. } => "not downloadable",
            Self::MissingUrl => "missing url",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichedRow {
    pub row_id: RowId,
    pub primary: PrimaryImage,
    pub secondary: SecondaryImage,
    /// Selected detail columns; absent cells are empty strings
    pub details: Map<String, Value>,
    pub matched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub rows: Vec<EnrichedRow>,
    /// Rows followed by a pacing pause
    pub paced_rows: usize,
}

impl EnrichmentReport {
    pub fn primary_ready(&self) -> usize {
        self.rows.iter().filter(|r| r.primary.bytes().is_some()).count()
    }

    pub fn secondary_ready(&self) -> usize {
        self.rows.iter().filter(|r| r.secondary.bytes().is_some()).count()
    }
}

pub struct RowEnrichmentPass {
    resolver: ImageResolver,
    images: Arc<dyn ImageSource>,
    cache: Arc<ResolutionCache>,
}

impl RowEnrichmentPass {
    pub fn new(
        resolver: ImageResolver,
        images: Arc<dyn ImageSource>,
        cache: Arc<ResolutionCache>,
    ) -> Self {
        Self {
            resolver,
            images,
            cache,
        }
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    /// Image bytes for `url`, memoized for the image TTL
    pub async fn download_image(&self, url: &str) -> Option<Arc<[u8]>> {
        let cached = self
            .cache
            .get_or_compute(CacheKind::ImageBytes, url, || async {
                self.images
                    .download(url)
                    .await
                    .map(|bytes| CachedValue::Bytes(Arc::from(bytes)))
            })
            .await?;

        match cached {
            CachedValue::Bytes(bytes) => Some(bytes),
            CachedValue::Text(_) => None,
        }
    }

    /// Enrich `row_ids` in order.
    ///
    /// When no direct primary-image column is selected and `pacing` is non-zero,
    /// the pass pauses for `pacing` after every row, whether or not the page came
    /// from the cache. A selected direct column disables pacing entirely, even for
    /// rows whose direct field is blank.
    pub async fn enrich<I>(
        &self,
        table: &SourceTable,
        row_ids: I,
        selection: &ColumnSelection,
        judgments: &JudgmentStore,
        pacing: Duration,
    ) -> EnrichmentReport
    where
        I: IntoIterator<Item = RowId>,
    {
        let details = selection.effective_details(table);
        let pace = selection.primary_image.is_none() && !pacing.is_zero();
        let mut report = EnrichmentReport::default();

        for row_id in row_ids {
            let Some(row) = table.row(row_id) else {
                warn!("Row {} is outside the table; skipped", row_id);
                continue;
            };

            let enriched = self.enrich_row(&row, selection, &details, judgments).await;
            report.rows.push(enriched);

            if pace {
                tokio::time::sleep(pacing).await;
                report.paced_rows += 1;
            }
        }

        info!(
            "Enriched {} rows (primary ready: {}, secondary ready: {}, paced: {})",
            report.rows.len(),
            report.primary_ready(),
            report.secondary_ready(),
            report.paced_rows
        );
        report
    }

    async fn enrich_row(
        &self,
        row: &Row<'_>,
        selection: &ColumnSelection,
        details: &[String],
        judgments: &JudgmentStore,
    ) -> EnrichedRow {
        let primary = match self
            .resolver
            .resolve(row, &selection.primary_url, selection.primary_image.as_deref())
            .await
        {
            Some(url) => match self.download_image(&url).await {
                Some(bytes) => PrimaryImage::Ready { url, bytes },
                None => PrimaryImage::NotDownloadable { url },
            },
            None => PrimaryImage::NotFound,
        };

        let secondary = match row.text(&selection.secondary_image) {
            Some(url) => match self.download_image(url).await {
                Some(bytes) => SecondaryImage::Ready {
                    url: url.to_string(),
                    bytes,
                },
                None => SecondaryImage::NotDownloadable {
                    url: url.to_string(),
                },
            },
            None => SecondaryImage::MissingUrl,
        };

        debug!(
            "Row {}: primary {}, secondary {}",
            row.id(),
            primary.label(),
            secondary.label()
        );

        EnrichedRow {
            row_id: row.id(),
            primary,
            secondary,
            details: detail_map(row, details),
            matched: judgments.get(row.id()),
        }
    }
}

fn detail_map(row: &Row<'_>, columns: &[String]) -> Map<String, Value> {
    columns
        .iter()
        .map(|column| {
            let value = row.get(column).unwrap_or_default();
            (column.clone(), Value::String(value.to_string()))
        })
        .collect()
}
