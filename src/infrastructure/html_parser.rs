//! Image metadata extraction from product pages
//!
//! Product pages advertise their main picture through social metadata.
//! The extractor reads, in order:
//! 1. `<meta property="og:image" content="...">`
//! 2. `<meta name="twitter:image" content="...">`
//!
//! A tag with missing or blank content does not count. Parsing is permissive
//! (html5ever recovers from any markup), so malformed pages simply yield `None`.

use scraper::{Html, Selector};
use tracing::debug;

/// One metadata source the extractor consults
#[derive(Debug, Clone)]
pub struct MetaSource {
    /// Name used in logs
    pub label: &'static str,
    /// CSS selector matching the meta tag
    pub selector: Selector,
}

/// Extracts the advertised image URL from page markup
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    sources: Vec<MetaSource>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    /// Extractor with the standard `og:image` then `twitter:image` order
    pub fn new() -> Self {
        let sources = [
            ("og:image", r#"meta[property="og:image"]"#),
            ("twitter:image", r#"meta[name="twitter:image"]"#),
        ]
        .into_iter()
        .filter_map(|(label, css)| {
            Selector::parse(css)
                .ok()
                .map(|selector| MetaSource { label, selector })
        })
        .collect();

        Self { sources }
    }

    /// Return the first non-blank image URL found, trimmed
    pub fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        for source in &self.sources {
            let found = document
                .select(&source.selector)
                .filter_map(|element| element.value().attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty());

            if let Some(content) = found {
                debug!("Image URL found via {}: {}", source.label, content);
                return Some(content.to_string());
            }
        }

        debug!("No image metadata in page ({} bytes)", html.len());
        None
    }
}
