//! Image byte retrieval with a hard size ceiling
//!
//! Previews only need the first few megabytes, so the body is streamed and
//! reading stops as soon as the accumulated length exceeds the ceiling. Whatever
//! was read so far is returned; an oversized image is never an error.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::infrastructure::errors::NetworkError;
use crate::infrastructure::http_client::NetworkClient;

/// Source of image bytes. Implemented by the HTTP retriever and by test fakes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download up to the configured ceiling, or `None` on any failure.
    async fn download(&self, url: &str) -> Option<Vec<u8>>;
}

/// Outcome of reading a capped stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CappedBody {
    pub data: Vec<u8>,
    /// True when reading stopped early because the ceiling was exceeded
    pub truncated: bool,
}

/// Accumulate chunks until the stream ends, an empty chunk arrives, or the total
/// exceeds `max_bytes`. The chunk that crosses the ceiling is kept, so the result
/// is at most `max_bytes` plus one chunk.
pub async fn read_capped<S, E>(stream: S, max_bytes: usize) -> Result<CappedBody, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut data = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            break;
        }
        data.extend_from_slice(&chunk);
        if data.len() > max_bytes {
            return Ok(CappedBody {
                data,
                truncated: true,
            });
        }
    }

    Ok(CappedBody {
        data,
        truncated: false,
    })
}

/// Image retriever backed by the shared [`NetworkClient`]
pub struct HttpImageRetriever {
    client: Arc<NetworkClient>,
    max_bytes: usize,
}

impl HttpImageRetriever {
    pub fn new(client: Arc<NetworkClient>, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }

    async fn download_capped(&self, url: &str) -> Result<CappedBody, NetworkError> {
        let response = self.client.get(url, true).await?;
        read_capped(response.bytes_stream(), self.max_bytes)
            .await
            .map_err(|e: reqwest::Error| NetworkError::BodyStream {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ImageSource for HttpImageRetriever {
    async fn download(&self, url: &str) -> Option<Vec<u8>> {
        match self.download_capped(url).await {
            Ok(body) => {
                if body.truncated {
                    debug!(
                        "Image truncated at {} bytes (ceiling {}): {}",
                        body.data.len(),
                        self.max_bytes,
                        url
                    );
                } else {
                    debug!("Downloaded image {} ({} bytes)", url, body.data.len());
                }
                Some(body.data)
            }
            Err(e) if e.is_http_status() => {
                debug!("Image unavailable: {}", e);
                None
            }
            Err(e) => {
                warn!("⚠️ Image download failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    const CHUNK: usize = 64 * 1024;
    const CEILING: usize = 3_500_000;

    fn chunked(total: usize) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        let chunks: Vec<Result<Bytes, Infallible>> = (0..total.div_ceil(CHUNK))
            .map(|i| {
                let len = CHUNK.min(total - i * CHUNK);
                Ok(Bytes::from(vec![0xAB; len]))
            })
            .collect();
        stream::iter(chunks)
    }

    #[tokio::test]
    async fn oversized_stream_is_truncated_not_failed() {
        let body = read_capped(chunked(4 * 1024 * 1024), CEILING).await.unwrap();
        assert!(body.truncated);
        assert!(body.data.len() > CEILING);
        assert!(body.data.len() <= CEILING + CHUNK);
        assert!(body.data.len() < 4 * 1024 * 1024);
    }

    #[tokio::test]
    async fn small_stream_is_returned_whole() {
        let body = read_capped(chunked(200_000), CEILING).await.unwrap();
        assert!(!body.truncated);
        assert_eq!(body.data.len(), 200_000);
    }

    #[tokio::test]
    async fn empty_chunk_ends_the_stream() {
        let chunks: Vec<Result<Bytes, Infallible>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"ignored")),
        ];
        let body = read_capped(stream::iter(chunks), CEILING).await.unwrap();
        assert_eq!(body.data, b"abc");
    }

    #[tokio::test]
    async fn mid_stream_error_propagates_to_caller() {
        let chunks: Vec<Result<Bytes, &str>> =
            vec![Ok(Bytes::from_static(b"partial")), Err("connection reset")];
        let result = read_capped(stream::iter(chunks), CEILING).await;
        assert_eq!(result, Err("connection reset"));
    }
}
