//! Error types for catalog_sync

use std::path::PathBuf;

/// Unified error type for catalog_sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// File I/O error outside the snapshot
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success status other than 403/429
    #[error("HTTP error {status} for {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The API answered 403: this host refuses us for the rest of the run
    #[error("Access blocked (HTTP 403) for {url}")]
    Blocked { url: String },

    /// Gave up after the configured number of 429 retries
    #[error("Quota still exceeded after {attempts} attempts for {url}")]
    QuotaExhausted { url: String, attempts: u32 },

    #[error("Failed to read snapshot {}: {source}", path.display())]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Snapshot {} is corrupt: {source}", path.display())]
    SnapshotCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write snapshot {}: {source}", path.display())]
    SnapshotWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Master list body was not a JSON array
    #[error("Card list response is not a list: {0}")]
    InvalidCardList(String),

    /// Master list could not be fetched; the run cannot continue without it
    #[error("Master card list unavailable: {0}")]
    ListingFailed(#[source] Box<SyncError>),

    /// Detail lookup returned no entries for a card
    #[error("No detail returned for card {0}")]
    EmptyDetail(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Errors that abort the whole run and leave the snapshot untouched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Blocked { .. }
                | SyncError::SnapshotRead { .. }
                | SyncError::SnapshotCorrupt { .. }
                | SyncError::SnapshotWrite { .. }
                | SyncError::InvalidCardList(_)
                | SyncError::ListingFailed(_)
                | SyncError::Config(_)
        )
    }
}

/// Result alias for catalog_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
