//! Catalog Sync - incremental Digimon TCG card mirror
//!
//! Pulls the master card list from the public card API, fetches detail and
//! card art for cards not yet stored, and commits the merged catalog back to
//! a local JSON snapshot. All requests run serially under one shared quota.

pub mod card;
pub mod clock;
pub mod config;
pub mod error;
pub mod image_cache;
pub mod rate_limiter;
pub mod snapshot;
pub mod sync;
pub mod transport;
pub mod utils;

// Re-export commonly used items
pub use card::{card_number, image_url, CardRecord};
pub use clock::{Clock, SystemClock};
pub use config::{DetailMode, RateLimitConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use image_cache::{ImageCache, ImageOutcome};
pub use rate_limiter::RateLimiter;
pub use snapshot::{Snapshot, SnapshotStore};
pub use sync::{sync_catalog, SyncEngine, SyncPhase, SyncReport};
pub use transport::Transport;
