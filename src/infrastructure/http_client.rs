//! HTTP client for page and image retrieval
//!
//! Provides the single configured client used by the page fetcher and the image
//! retriever: fixed browser identity, connect/read timeouts, optional upstream proxy.
//! Every transport failure is returned as a [`NetworkError`] value; nothing here panics
//! on a bad URL, DNS failure, TLS error or timeout.

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Proxy, Response};
use tracing::{debug, info};

use crate::infrastructure::config::{NetworkConfig, ProxyConfig};
use crate::infrastructure::errors::NetworkError;

/// Configured HTTP client. Holds no state beyond its configuration and connection pool.
#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
    proxy_address: Option<String>,
}

impl NetworkClient {
    /// Create a new client from network and proxy settings
    pub fn new(network: &NetworkConfig, proxy: &ProxyConfig) -> Result<Self, NetworkError> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&network.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Ok(value) = HeaderValue::from_str(&network.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .connect_timeout(network.connect_timeout())
            .read_timeout(network.read_timeout())
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(network.max_redirects));

        if let Some(proxy_url) = proxy.proxy_url() {
            let proxy_rule = Proxy::all(&proxy_url).map_err(|source| NetworkError::InvalidProxy {
                proxy: proxy.display_address().unwrap_or_default(),
                source,
            })?;
            builder = builder.proxy(proxy_rule);
            info!(
                "🌐 Upstream proxy enabled: {}",
                proxy.display_address().unwrap_or_default()
            );
        } else {
            builder = builder.no_proxy();
            info!("🌐 No upstream proxy configured");
        }

        let client = builder.build().map_err(NetworkError::ClientBuild)?;

        Ok(Self {
            client,
            proxy_address: proxy.display_address(),
        })
    }

    /// Whether requests go through the upstream proxy
    pub fn proxy_active(&self) -> bool {
        self.proxy_address.is_some()
    }

    /// Issue a GET request.
    ///
    /// Statuses >= 400 are returned as [`NetworkError::HttpStatus`]. When `streaming` is
    /// true the body is left unread for the caller to consume chunk by chunk.
    pub async fn get(&self, url: &str, streaming: bool) -> Result<Response, NetworkError> {
        debug!("🌐 HTTP GET{}: {}", if streaming { " (stream)" } else { "" }, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError::request(url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(NetworkError::http_status(url, status.as_u16()));
        }

        debug!("HTTP {} for {}", status, url);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_without_proxy() {
        let client = NetworkClient::new(&NetworkConfig::default(), &ProxyConfig::default()).unwrap();
        assert!(!client.proxy_active());
    }

    #[test]
    fn test_client_creation_with_proxy() {
        let proxy = ProxyConfig {
            host: "127.0.0.1".into(),
            port: "3128".into(),
            user: "user".into(),
            pass: "pass".into(),
        };
        let client = NetworkClient::new(&NetworkConfig::default(), &proxy).unwrap();
        assert!(client.proxy_active());
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_failure_value() {
        let client = NetworkClient::new(&NetworkConfig::default(), &ProxyConfig::default()).unwrap();
        let result = client.get("not a url", false).await;
        assert!(matches!(result, Err(NetworkError::Request { .. })));
    }
}
