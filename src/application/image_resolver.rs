//! Primary image resolution
//!
//! A direct image field, when configured and filled in, wins without any network
//! access. Otherwise the product page is fetched and its social metadata is read.
//! Both the page and the extracted URL go through the resolution cache.

use std::sync::Arc;
use tracing::debug;

use crate::domain::table::Row;
use crate::infrastructure::html_parser::MetadataExtractor;
use crate::infrastructure::page_fetcher::PageSource;
use crate::infrastructure::resolution_cache::{CacheKind, CachedValue, ResolutionCache};

pub struct ImageResolver {
    pages: Arc<dyn PageSource>,
    extractor: MetadataExtractor,
    cache: Arc<ResolutionCache>,
}

impl ImageResolver {
    pub fn new(pages: Arc<dyn PageSource>, cache: Arc<ResolutionCache>) -> Self {
        Self {
            pages,
            extractor: MetadataExtractor::new(),
            cache,
        }
    }

    /// Page markup for `url`, memoized for the page TTL
    pub async fn fetch_page(&self, url: &str) -> Option<Arc<str>> {
        let cached = self
            .cache
            .get_or_compute(CacheKind::PageHtml, url, || async {
                self.pages
                    .fetch(url)
                    .await
                    .map(|html| CachedValue::Text(Arc::from(html)))
            })
            .await?;

        match cached {
            CachedValue::Text(html) => Some(html),
            CachedValue::Bytes(_) => None,
        }
    }

    /// Image URL advertised by the page at `page_url`, memoized by page URL.
    ///
    /// Only an extraction that ran on real markup is cached. A page that could not
    /// be fetched leaves no extraction entry, so it is retried once its page entry
    /// expires.
    pub async fn extract_image_url(&self, page_url: &str) -> Option<String> {
        if let Some(cached) = self.cache.lookup(CacheKind::ExtractedImageUrl, page_url) {
            debug!("Cache hit [{}] {}", CacheKind::ExtractedImageUrl, page_url);
            return cached.and_then(|value| value.as_text().map(ToString::to_string));
        }

        let html = self.fetch_page(page_url).await?;
        let extracted = self.extractor.extract(&html);
        self.cache.store(
            CacheKind::ExtractedImageUrl,
            page_url,
            extracted.as_deref().map(|url| CachedValue::Text(Arc::from(url))),
        );
        extracted
    }

    /// Resolve the primary image URL of `row`
    pub async fn resolve(
        &self,
        row: &Row<'_>,
        primary_url_field: &str,
        image_field: Option<&str>,
    ) -> Option<String> {
        if let Some(direct) = image_field.and_then(|field| row.text(field)) {
            debug!("Row {}: using direct image field", row.id());
            return Some(direct.to_string());
        }

        let page_url = row.text(primary_url_field)?;
        let resolved = self.extract_image_url(page_url).await;
        if resolved.is_none() {
            debug!("Row {}: no image advertised by {}", row.id(), page_url);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::CountingPages;
    use crate::domain::table::SourceTable;
    use crate::infrastructure::resolution_cache::CachePolicy;
    use crate::infrastructure::resolution_cache::test_support::ManualClock;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(60 * 60);
    const SECOND: Duration = Duration::from_secs(1);

    fn table(rows: Vec<Vec<Option<&str>>>) -> SourceTable {
        SourceTable::new(
            vec!["url".into(), "direct".into()],
            rows.into_iter()
                .map(|r| r.into_iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        )
    }

    fn resolver(pages: Arc<CountingPages>) -> ImageResolver {
        ImageResolver::new(pages, Arc::new(ResolutionCache::default()))
    }

    fn resolver_with_clock(pages: Arc<CountingPages>) -> (ImageResolver, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResolutionCache::with_clock(CachePolicy::default(), clock.clone());
        (ImageResolver::new(pages, Arc::new(cache)), clock)
    }

    const PRODUCT_PAGE: &str = r#"<meta property="og:image" content="https://cdn/1.jpg">"#;

    #[tokio::test]
    async fn direct_field_skips_the_network() {
        let pages = Arc::new(CountingPages::default());
        let resolver = resolver(pages.clone());
        let table = table(vec![vec![Some("https://shop/p/1"), Some("http://x/img.png")]]);
        let row = table.row(0).unwrap();

        let url = resolver.resolve(&row, "url", Some("direct")).await;
        assert_eq!(url.as_deref(), Some("http://x/img.png"));
        assert_eq!(pages.calls(), 0);
    }

    #[tokio::test]
    async fn blank_direct_field_falls_back_to_page_metadata() {
        let pages = Arc::new(CountingPages::default().with_page(
            "https://shop/p/1",
            r#"<meta property="og:image" content="https://cdn/1.jpg">"#,
        ));
        let resolver = resolver(pages.clone());
        let table = table(vec![vec![Some(" https://shop/p/1 "), Some("   ")]]);
        let row = table.row(0).unwrap();

        let url = resolver.resolve(&row, "url", Some("direct")).await;
        assert_eq!(url.as_deref(), Some("https://cdn/1.jpg"));
        assert_eq!(pages.calls(), 1);
    }

    #[tokio::test]
    async fn blank_primary_url_resolves_to_nothing() {
        let pages = Arc::new(CountingPages::default());
        let resolver = resolver(pages.clone());
        let table = table(vec![vec![Some("  "), None]]);

        assert!(resolver.resolve(&table.row(0).unwrap(), "url", None).await.is_none());
        assert_eq!(pages.calls(), 0);
    }

    #[tokio::test]
    async fn pages_are_fetched_once_within_ttl() {
        let pages = Arc::new(CountingPages::default().with_page("url1", "<html></html>"));
        let resolver = resolver(pages.clone());

        assert!(resolver.fetch_page("url1").await.is_some());
        assert!(resolver.fetch_page("url1").await.is_some());
        assert_eq!(pages.calls(), 1);
    }

    #[tokio::test]
    async fn missing_pages_are_negatively_cached() {
        let pages = Arc::new(CountingPages::default());
        let resolver = resolver(pages.clone());

        assert!(resolver.extract_image_url("https://gone").await.is_none());
        assert!(resolver.extract_image_url("https://gone").await.is_none());
        assert_eq!(pages.calls(), 1);
    }

    #[tokio::test]
    async fn failed_page_is_retried_after_the_page_ttl() {
        let pages = Arc::new(
            CountingPages::default()
                .with_failures(1)
                .with_page("https://shop/p/1", PRODUCT_PAGE),
        );
        let (resolver, clock) = resolver_with_clock(pages.clone());

        assert!(resolver.extract_image_url("https://shop/p/1").await.is_none());
        assert_eq!(pages.calls(), 1);

        clock.advance(HOUR / 2);
        assert!(resolver.extract_image_url("https://shop/p/1").await.is_none());
        assert_eq!(pages.calls(), 1);

        // Past the page TTL but far inside the extraction TTL
        clock.advance(HOUR / 2 + SECOND);
        let url = resolver.extract_image_url("https://shop/p/1").await;
        assert_eq!(url.as_deref(), Some("https://cdn/1.jpg"));
        assert_eq!(pages.calls(), 2);
    }

    #[tokio::test]
    async fn extraction_outlives_the_page_entry() {
        let pages = Arc::new(CountingPages::default().with_page("https://shop/p/1", PRODUCT_PAGE));
        let (resolver, clock) = resolver_with_clock(pages.clone());

        assert!(resolver.extract_image_url("https://shop/p/1").await.is_some());
        assert_eq!(pages.calls(), 1);

        clock.advance(HOUR + SECOND);
        let url = resolver.extract_image_url("https://shop/p/1").await;
        assert_eq!(url.as_deref(), Some("https://cdn/1.jpg"));
        assert_eq!(pages.calls(), 1);

        // The page entry itself has expired
        assert!(resolver.fetch_page("https://shop/p/1").await.is_some());
        assert_eq!(pages.calls(), 2);

        clock.advance(24 * HOUR);
        assert!(resolver.extract_image_url("https://shop/p/1").await.is_some());
        assert_eq!(pages.calls(), 3);
    }

    #[tokio::test]
    async fn page_without_metadata_is_cached_as_no_image() {
        let pages = Arc::new(CountingPages::default().with_page("https://shop/p/2", "<html></html>"));
        let (resolver, clock) = resolver_with_clock(pages.clone());

        assert!(resolver.extract_image_url("https://shop/p/2").await.is_none());
        clock.advance(HOUR + SECOND);
        assert!(resolver.extract_image_url("https://shop/p/2").await.is_none());
        assert_eq!(pages.calls(), 1);
    }
}
