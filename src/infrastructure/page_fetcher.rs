//! Product page retrieval
//!
//! The page fetcher returns decoded markup or nothing. Transport errors and
//! HTTP statuses >= 400 are logged and collapse to `None`.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::infrastructure::charset::decode_body;
use crate::infrastructure::errors::NetworkError;
use crate::infrastructure::http_client::NetworkClient;

/// Source of page markup. Implemented by the HTTP fetcher and by test fakes.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the markup at `url`, or `None` when it cannot be retrieved.
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Page fetcher backed by the shared [`NetworkClient`]
pub struct HttpPageFetcher {
    client: Arc<NetworkClient>,
}

impl HttpPageFetcher {
    pub fn new(client: Arc<NetworkClient>) -> Self {
        Self { client }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, NetworkError> {
        let response = self.client.get(url, false).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let body = response.bytes().await.map_err(|e| NetworkError::BodyStream {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(decode_body(&body, content_type.as_deref()))
    }
}

#[async_trait]
impl PageSource for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.fetch_text(url).await {
            Ok(html) => {
                debug!("Fetched page {} ({} chars)", url, html.len());
                Some(html)
            }
            Err(e) if e.is_http_status() => {
                debug!("Page unavailable: {}", e);
                None
            }
            Err(e) => {
                warn!("⚠️ Page fetch failed: {}", e);
                None
            }
        }
    }
}
