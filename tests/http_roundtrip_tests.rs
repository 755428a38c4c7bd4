//! Page fetcher and image retriever against a local HTTP server

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use catalog_matcher_lib::infrastructure::config::{NetworkConfig, ProxyConfig};
use catalog_matcher_lib::infrastructure::html_parser::MetadataExtractor;
use catalog_matcher_lib::infrastructure::http_client::NetworkClient;
use catalog_matcher_lib::infrastructure::image_retriever::{HttpImageRetriever, ImageSource};
use catalog_matcher_lib::infrastructure::page_fetcher::{HttpPageFetcher, PageSource};

const CAP: usize = 3_500_000;
const BIG_BODY: usize = 8_000_000;

fn route(path: &str) -> (u16, &'static str, Vec<u8>) {
    match path {
        "/product" => (
            200,
            "text/html; charset=utf-8",
            br#"<html><head>
                <meta name="twitter:image" content="https://cdn.example/t.jpg">
                <meta property="og:image" content=" https://cdn.example/og.jpg ">
            </head></html>"#
                .to_vec(),
        ),
        "/latin1" => (
            200,
            "text/html; charset=iso-8859-1",
            b"<html><title>Caf\xe9</title></html>".to_vec(),
        ),
        "/small.png" => (200, "image/png", b"\x89PNG\r\n\x1a\nsmall".to_vec()),
        "/big.jpg" => (200, "image/jpeg", vec![0xAB; BIG_BODY]),
        "/forbidden" => (403, "text/plain", b"no".to_vec()),
        _ => (404, "text/plain", b"not found".to_vec()),
    }
}

/// Serve canned responses until the test ends; returns the base URL
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buffer = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buffer).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buffer[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, content_type, body) = route(&path);
                let head = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in body.chunks(64 * 1024) {
                    // The client hangs up once it has enough bytes
                    if socket.write_all(chunk).await.is_err() {
                        return;
                    }
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{address}")
}

fn client() -> Arc<NetworkClient> {
    Arc::new(NetworkClient::new(&NetworkConfig::default(), &ProxyConfig::default()).unwrap())
}

#[tokio::test]
async fn page_markup_is_fetched_and_metadata_extracted() {
    let base = spawn_server().await;
    let fetcher = HttpPageFetcher::new(client());

    let html = fetcher.fetch(&format!("{base}/product")).await.unwrap();
    assert_eq!(
        MetadataExtractor::new().extract(&html).as_deref(),
        Some("https://cdn.example/og.jpg")
    );
}

#[tokio::test]
async fn declared_charset_is_honored() {
    let base = spawn_server().await;
    let fetcher = HttpPageFetcher::new(client());

    let html = fetcher.fetch(&format!("{base}/latin1")).await.unwrap();
    assert!(html.contains("Café"));
}

#[tokio::test]
async fn error_statuses_yield_nothing() {
    let base = spawn_server().await;
    let fetcher = HttpPageFetcher::new(client());
    let retriever = HttpImageRetriever::new(client(), CAP);

    assert!(fetcher.fetch(&format!("{base}/missing")).await.is_none());
    assert!(fetcher.fetch(&format!("{base}/forbidden")).await.is_none());
    assert!(retriever.download(&format!("{base}/missing.jpg")).await.is_none());
}

#[tokio::test]
async fn unreachable_hosts_yield_nothing() {
    // Bind and drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpPageFetcher::new(client());
    assert!(fetcher.fetch(&format!("http://{address}/product")).await.is_none());
    assert!(fetcher.fetch("not a url").await.is_none());
}

#[tokio::test]
async fn small_images_are_returned_whole() {
    let base = spawn_server().await;
    let retriever = HttpImageRetriever::new(client(), CAP);

    let bytes = retriever.download(&format!("{base}/small.png")).await.unwrap();
    assert_eq!(bytes, b"\x89PNG\r\n\x1a\nsmall");
}

#[tokio::test]
async fn oversized_images_are_truncated_past_the_ceiling() {
    let base = spawn_server().await;
    let retriever = HttpImageRetriever::new(client(), CAP);

    let bytes = retriever.download(&format!("{base}/big.jpg")).await.unwrap();
    assert!(bytes.len() > CAP);
    assert!(bytes.len() < BIG_BODY);
}
