//! Error types for the infrastructure layer
//!
//! Every network-facing operation is typed here first and only collapsed into
//! "no image" at the public fetch/download seam, so the reason still reaches the logs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid proxy URL '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Response body interrupted for {url}: {reason}")]
    BodyStream { url: String, reason: String },
}

impl NetworkError {
    pub fn request(url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }

    pub fn http_status(url: &str, status: u16) -> Self {
        Self::HttpStatus {
            status,
            url: url.to_string(),
        }
    }

    /// True for failures the remote side reported (status >= 400) as opposed to transport errors.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Self::HttpStatus { .. })
    }
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read table file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Table could not be parsed with ',' ({comma}) nor with ';' ({semicolon})")]
    UnparseableTable { comma: String, semicolon: String },

    #[error("Table has no header row")]
    MissingHeader,

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_error_is_classified() {
        let err = NetworkError::http_status("https://example.com/p", 404);
        assert!(err.is_http_status());
        assert_eq!(err.to_string(), "HTTP error 404: https://example.com/p");
    }

    #[test]
    fn unparseable_table_mentions_both_delimiters() {
        let err = TableError::UnparseableTable {
            comma: "bad comma".into(),
            semicolon: "bad semicolon".into(),
        };
        let message = err.to_string();
        assert!(message.contains("','"));
        assert!(message.contains("';'"));
    }
}
