use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Unknown scanner: {key}")]
    UnknownScanner { key: String },

    #[error("Scanner already registered: {key}")]
    DuplicateScanner { key: String },

    #[error("Snapshot format error: {message}")]
    SnapshotFormat { message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid scheduler state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure raised by a single scanner call. Never escapes a poll cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("unexpected page structure: {message}")]
    Parse { message: String },

    #[error("scan timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Parse,
    Timeout,
}

impl ScanError {
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ScanError::Parse {
            message: message.into(),
        }
    }

    /// Convert a reqwest failure, keeping the URL it was aimed at.
    pub fn from_http(url: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ScanError::parse(format!("could not decode response from {}: {}", url, err));
        }
        let message = match err.status() {
            Some(status) => format!("HTTP {}", status),
            None if err.is_timeout() => "request timed out".to_string(),
            None if err.is_connect() => format!("connection failed: {}", err),
            None => err.to_string(),
        };
        ScanError::fetch(url, message)
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ScanError::Fetch { .. } => FailureKind::Fetch,
            ScanError::Parse { .. } => FailureKind::Parse,
            ScanError::Timeout { .. } => FailureKind::Timeout,
        }
    }

    /// Whether retrying later can reasonably be expected to help.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ScanError::Parse { .. })
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Fetch => write!(f, "fetch error"),
            FailureKind::Parse => write!(f, "parse error"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}
