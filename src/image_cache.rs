//! Persistent on-disk store for card art
//!
//! Images are stored as `<card number>.<ext>` in the image directory. The
//! file's existence is the only marker that a card's art was downloaded, so
//! an existing file is never fetched or written again.

use crate::error::SyncError;
use crate::transport::Transport;
use crate::utils::write_atomic;
use std::path::{Path, PathBuf};

/// What [`ImageCache::acquire`] did for one card
#[derive(Debug)]
pub enum ImageOutcome {
    /// No image URL was available
    NoUrl,
    /// File already on disk, nothing fetched
    Cached,
    Downloaded { bytes: usize },
    /// Fetch or write failed; the card number belongs in `failed_images`
    Failed(SyncError),
}

impl ImageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ImageOutcome::Failed(_))
    }
}

pub struct ImageCache {
    image_dir: PathBuf,
    extension: String,
}

impl ImageCache {
    /// Create a new image cache, creating the directory if needed
    pub fn new(image_dir: impl Into<PathBuf>, extension: &str) -> Self {
        let image_dir = image_dir.into();

        if let Err(e) = std::fs::create_dir_all(&image_dir) {
            log::warn!("Failed to create image directory: {}", e);
        } else {
            log::info!("Image directory: {:?}", image_dir);
        }

        Self {
            image_dir,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Generate a filename from the card number; path separators become `_`
    fn filename(&self, card_number: &str) -> String {
        let safe: String = card_number
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("{}.{}", safe, self.extension)
    }

    /// Get the full path for a card's image
    pub fn image_path(&self, card_number: &str) -> PathBuf {
        self.image_dir.join(self.filename(card_number))
    }

    /// Check if an image is already on disk
    pub fn contains(&self, card_number: &str) -> bool {
        self.image_path(card_number).exists()
    }

    /// Download the art for `card_number` unless it is already on disk.
    /// Never returns an error: failures come back as [`ImageOutcome::Failed`].
    pub fn acquire(
        &self,
        transport: &mut Transport,
        card_number: &str,
        url: Option<&str>,
    ) -> ImageOutcome {
        let url = match url.map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return ImageOutcome::NoUrl,
        };

        let path = self.image_path(card_number);
        if path.exists() {
            log::debug!("Image cache hit for {}", card_number);
            return ImageOutcome::Cached;
        }

        log::info!("Downloading image for {}", card_number);
        let bytes = match transport.fetch_bytes(url) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Image download failed for {}: {}", card_number, e);
                return ImageOutcome::Failed(e);
            }
        };

        if let Err(e) = self.insert(&path, &bytes) {
            log::warn!("Failed to store image for {}: {}", card_number, e);
            return ImageOutcome::Failed(SyncError::Io(e));
        }

        log::debug!("Cached image for {} ({} bytes)", card_number, bytes.len());
        ImageOutcome::Downloaded { bytes: bytes.len() }
    }

    fn insert(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.image_dir)?;
        write_atomic(path, bytes)
    }
}

#[cfg(test)]
#[path = "image_cache_tests.rs"]
mod tests;
