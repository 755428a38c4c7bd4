//! Review use case
//!
//! Ties a session, the operator's column selection and pagination to the shared
//! network services. Every operator action maps to one method here; the terminal
//! front end only parses commands and renders results.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::application::enrichment::{EnrichmentReport, RowEnrichmentPass};
use crate::application::export::{ExportComposer, ExportTable};
use crate::application::image_resolver::ImageResolver;
use crate::domain::pagination::Pagination;
use crate::domain::session::{Session, SessionError};
use crate::domain::table::{ColumnSelection, RowId, SourceTable};
use crate::infrastructure::config::{AppConfig, defaults};
use crate::infrastructure::errors::{NetworkError, TableError};
use crate::infrastructure::http_client::NetworkClient;
use crate::infrastructure::image_retriever::{HttpImageRetriever, ImageSource};
use crate::infrastructure::page_fetcher::{HttpPageFetcher, PageSource};
use crate::infrastructure::resolution_cache::{CachePolicy, CacheStats, ResolutionCache};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Rows per page must be one of {allowed:?}, got {requested}")]
    InvalidPageSize {
        requested: usize,
        allowed: &'static [usize],
    },

    #[error("Pacing must be between 0 and {max} ms, got {requested}")]
    PacingOutOfRange { requested: u64, max: u64 },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Services shared by every page render; built once per process
pub struct ReviewServices {
    enrichment: RowEnrichmentPass,
    cache: Arc<ResolutionCache>,
    proxy_active: bool,
}

impl ReviewServices {
    pub fn from_config(config: &AppConfig) -> Result<Self, NetworkError> {
        let client = Arc::new(NetworkClient::new(&config.network, &config.proxy)?);
        let proxy_active = client.proxy_active();
        let cache = Arc::new(ResolutionCache::new(CachePolicy::from(&config.cache)));
        let pages = Arc::new(HttpPageFetcher::new(client.clone()));
        let images = Arc::new(HttpImageRetriever::new(client, config.images.max_bytes));
        Ok(Self::with_sources(pages, images, cache, proxy_active))
    }

    /// Build from explicit sources (fakes in tests)
    pub fn with_sources(
        pages: Arc<dyn PageSource>,
        images: Arc<dyn ImageSource>,
        cache: Arc<ResolutionCache>,
        proxy_active: bool,
    ) -> Self {
        let resolver = ImageResolver::new(pages, cache.clone());
        Self {
            enrichment: RowEnrichmentPass::new(resolver, images, cache.clone()),
            cache,
            proxy_active,
        }
    }

    pub fn enrichment(&self) -> &RowEnrichmentPass {
        &self.enrichment
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn proxy_active(&self) -> bool {
        self.proxy_active
    }
}

/// Status line contents
#[derive(Debug, Clone, Serialize)]
pub struct ReviewStatus {
    pub rows: usize,
    pub columns: usize,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub pacing_ms: u64,
    pub proxy_active: bool,
    pub matched: usize,
    #[serde(skip)]
    pub cache: CacheStats,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows: {} | columns: {} | page {}/{} ({} per page) | pacing: {} ms | proxy: {} | matched: {} | cache: {}",
            self.rows,
            self.columns,
            self.page,
            self.total_pages,
            self.page_size,
            self.pacing_ms,
            if self.proxy_active { "yes" } else { "no" },
            self.matched,
            self.cache
        )
    }
}

pub struct ReviewSession {
    session: Session,
    selection: ColumnSelection,
    services: ReviewServices,
    pagination: Pagination,
    page: usize,
    pacing_ms: u64,
}

impl ReviewSession {
    pub fn new(
        table: SourceTable,
        selection: ColumnSelection,
        services: ReviewServices,
        page_size: usize,
        pacing_ms: u64,
    ) -> Result<Self, ReviewError> {
        selection.validate(&table)?;
        check_page_size(page_size)?;
        check_pacing(pacing_ms)?;

        let pagination = Pagination::new(table.row_count(), page_size);
        info!(
            "Review started: primary url '{}', secondary image '{}', direct image {:?}",
            selection.primary_url, selection.secondary_image, selection.primary_image
        );
        Ok(Self {
            session: Session::new(table),
            selection,
            services,
            pagination,
            page: 1,
            pacing_ms,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    pub fn services(&self) -> &ReviewServices {
        &self.services
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages()
    }

    pub fn page_size(&self) -> usize {
        self.pagination.page_size()
    }

    pub fn pacing_ms(&self) -> u64 {
        self.pacing_ms
    }

    /// Jump to `page`; out-of-range requests are clamped. Returns the page shown.
    pub fn go_to(&mut self, page: usize) -> usize {
        self.page = self.pagination.clamp_page(page);
        self.page
    }

    pub fn next_page(&mut self) -> usize {
        self.go_to(self.page + 1)
    }

    pub fn previous_page(&mut self) -> usize {
        self.go_to(self.page.saturating_sub(1))
    }

    /// Change rows per page; the view returns to page 1
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ReviewError> {
        check_page_size(page_size)?;
        self.pagination = Pagination::new(self.session.table().row_count(), page_size);
        self.page = 1;
        Ok(())
    }

    pub fn set_pacing(&mut self, pacing_ms: u64) -> Result<(), ReviewError> {
        check_pacing(pacing_ms)?;
        self.pacing_ms = pacing_ms;
        Ok(())
    }

    pub fn set_match(&mut self, row_id: RowId, matched: bool) -> Result<(), ReviewError> {
        self.session.set_judgment(row_id, matched)?;
        Ok(())
    }

    pub fn toggle_match(&mut self, row_id: RowId) -> Result<bool, ReviewError> {
        Ok(self.session.toggle_judgment(row_id)?)
    }

    pub fn reset_matches(&mut self) {
        self.session.reset_judgments();
    }

    /// Row identities on the current page
    pub fn current_rows(&self) -> std::ops::Range<RowId> {
        self.pagination.page_range(self.page)
    }

    /// Enrich the rows of the current page
    pub async fn render_page(&self) -> EnrichmentReport {
        info!("Rendering page {}/{}", self.page, self.total_pages());
        self.services
            .enrichment
            .enrich(
                self.session.table(),
                self.current_rows(),
                &self.selection,
                self.session.judgments(),
                Duration::from_millis(self.pacing_ms),
            )
            .await
    }

    pub fn compose_export(&self) -> ExportTable {
        ExportComposer::compose(self.session.table(), self.session.judgments())
    }

    pub fn export(&self, path: &Path) -> Result<ExportTable, ReviewError> {
        Ok(ExportComposer::export(
            self.session.table(),
            self.session.judgments(),
            path,
        )?)
    }

    /// Drop every cached result, including cached failures
    pub fn clear_cache(&self) -> usize {
        let dropped = self.services.cache.len();
        self.services.cache.clear();
        dropped
    }

    pub fn status(&self) -> ReviewStatus {
        let table = self.session.table();
        ReviewStatus {
            rows: table.row_count(),
            columns: table.column_count(),
            page: self.page,
            total_pages: self.total_pages(),
            page_size: self.page_size(),
            pacing_ms: self.pacing_ms,
            proxy_active: self.services.proxy_active,
            matched: self.session.judgments().matched_count(),
            cache: self.services.cache.stats(),
        }
    }
}

fn check_page_size(page_size: usize) -> Result<(), ReviewError> {
    if defaults::PAGE_SIZES.contains(&page_size) {
        Ok(())
    } else {
        Err(ReviewError::InvalidPageSize {
            requested: page_size,
            allowed: &defaults::PAGE_SIZES,
        })
    }
}

fn check_pacing(pacing_ms: u64) -> Result<(), ReviewError> {
    if pacing_ms <= defaults::MAX_PACING_MS {
        Ok(())
    } else {
        Err(ReviewError::PacingOutOfRange {
            requested: pacing_ms,
            max: defaults::MAX_PACING_MS,
        })
    }
}
