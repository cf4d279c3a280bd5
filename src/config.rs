//! Run configuration
//!
//! Defaults mirror the live digimoncard.io updater: 30s request timeout,
//! 30s cooldown after a 429, and a 15 requests / 10 seconds quota.

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://digimoncard.io/api-public";
pub const DEFAULT_SERIES: &str = "Digimon Card Game";
pub const SNAPSHOT_FILE_NAME: &str = "digimon_cards.json";
pub const IMAGE_DIR_NAME: &str = "images";

/// How a novel card's stored record is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DetailMode {
    /// Issue `search?card=<number>` and store the response verbatim
    #[default]
    Search,
    /// Store the master-list entry as-is, no second request
    ListEntry,
}

/// Sliding-window quota shared by every outbound request
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
    /// Added to every computed wait so we never land exactly on the boundary
    pub margin: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 15,
            window: Duration::from_secs(10),
            margin: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_base: String,
    pub snapshot_path: PathBuf,
    pub image_dir: PathBuf,
    pub image_extension: String,
    /// Fallback image URL with a `{card}` placeholder, used when a record has none
    pub image_url_template: Option<String>,
    /// `series` filter on the master list; `None` lists every series
    pub series: Option<String>,
    pub detail_mode: DetailMode,
    /// Store the verbatim master list as `card_list` in the snapshot
    pub keep_card_list: bool,
    /// Stop attempting novel cards after this many in one run
    pub max_new_cards: Option<usize>,
    pub request_timeout: Duration,
    pub rate_limit: RateLimitConfig,
    pub quota_cooldown: Duration,
    /// `None` retries a 429 forever
    pub max_quota_retries: Option<u32>,
    pub user_agent: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::in_dir(&default_data_dir())
    }
}

impl SyncConfig {
    /// Default configuration with the snapshot and images under `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            snapshot_path: data_dir.join(SNAPSHOT_FILE_NAME),
            image_dir: data_dir.join(IMAGE_DIR_NAME),
            image_extension: "jpg".to_string(),
            image_url_template: None,
            series: Some(DEFAULT_SERIES.to_string()),
            detail_mode: DetailMode::Search,
            keep_card_list: true,
            max_new_cards: None,
            request_timeout: Duration::from_secs(30),
            rate_limit: RateLimitConfig::default(),
            quota_cooldown: Duration::from_secs(30),
            max_quota_retries: None,
            user_agent: format!("catalog_sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(SyncError::Config("API base URL is empty".to_string()));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(SyncError::Config(
                "rate limit must allow at least one request".to_string(),
            ));
        }
        if self.rate_limit.window.is_zero() {
            return Err(SyncError::Config(
                "rate limit window must be longer than zero".to_string(),
            ));
        }
        if self.image_extension.trim().is_empty() {
            return Err(SyncError::Config("image extension is empty".to_string()));
        }
        Ok(())
    }

    /// Endpoint URL under the API base, tolerating a trailing slash
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), name)
    }
}

/// Returns the default data directory: ~/.local/share/catalog_sync
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog_sync")
}
