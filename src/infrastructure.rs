//! Infrastructure layer for networking, parsing, caching and file I/O
//!
//! This module provides the shared network client, page and image retrieval,
//! metadata extraction, the resolution cache, CSV I/O, configuration and logging.

pub mod charset;
pub mod config;
pub mod errors;
pub mod html_parser;
pub mod http_client;
pub mod image_retriever;
pub mod logging;
pub mod page_fetcher;
pub mod resolution_cache;
pub mod table_io;

// Re-export commonly used items
pub use config::AppConfig;
pub use errors::{ConfigError, NetworkError, TableError};
pub use html_parser::MetadataExtractor;
pub use http_client::NetworkClient;
pub use image_retriever::{HttpImageRetriever, ImageSource};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use page_fetcher::{HttpPageFetcher, PageSource};
pub use resolution_cache::{CacheKind, CachePolicy, CacheStats, CachedValue, ResolutionCache};
pub use table_io::{load_table, write_table};
