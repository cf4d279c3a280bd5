//! Durable catalog snapshot
//!
//! A single JSON document holding every stored card plus the failure lists of
//! past runs. Loaded once at the start of a run, written once at the end.

use crate::card::CardRecord;
use crate::error::{Result, SyncError};
use crate::utils::write_atomic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// ISO-8601 UTC with `Z`; `None` until the first completed run
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub total_cards: usize,
    /// Verbatim copy of the last master list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_list: Option<Vec<Value>>,
    /// Card number to stored record. Usually a [`CardRecord`] object, but
    /// `search` responses are kept verbatim and may be a one-element list.
    #[serde(default)]
    pub cards: BTreeMap<String, Value>,
    /// Card numbers whose detail fetch failed, in encounter order, never deduplicated
    #[serde(default)]
    pub failed_cards: Vec<String>,
    #[serde(default)]
    pub failed_images: Vec<String>,
    /// Fields written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Snapshot {
    /// Card numbers present before this run touches anything
    pub fn known_set(&self) -> HashSet<String> {
        self.cards.keys().cloned().collect()
    }

    pub fn contains(&self, card_number: &str) -> bool {
        self.cards.contains_key(card_number)
    }

    pub fn insert(&mut self, card_number: String, record: Value) {
        self.cards.insert(card_number, record);
    }

    pub fn get(&self, card_number: &str) -> Option<&Value> {
        self.cards.get(card_number)
    }

    /// Stored record as an object, unwrapping single-element detail lists
    pub fn record(&self, card_number: &str) -> Option<&CardRecord> {
        self.get(card_number).and_then(crate::card::detail_entry)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// File-backed store for the [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing file is a fresh, empty snapshot; a file
    /// that exists but cannot be read or parsed is an error.
    pub fn load(&self) -> Result<Snapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No snapshot at {}, starting with an empty catalog",
                    self.path.display()
                );
                return Ok(Snapshot::default());
            }
            Err(source) => {
                return Err(SyncError::SnapshotRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| SyncError::SnapshotCorrupt {
                path: self.path.clone(),
                source,
            })?;

        log::info!(
            "Loaded snapshot with {} cards (last updated: {})",
            snapshot.len(),
            snapshot.last_updated.as_deref().unwrap_or("never")
        );
        Ok(snapshot)
    }

    /// Write the whole snapshot atomically. `total_cards` is recomputed first.
    pub fn save(&self, snapshot: &mut Snapshot) -> Result<()> {
        snapshot.total_cards = snapshot.cards.len();

        let write_err = |source: std::io::Error| SyncError::SnapshotWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.path, content.as_bytes()).map_err(write_err)?;

        log::debug!(
            "Saved snapshot with {} cards to {}",
            snapshot.total_cards,
            self.path.display()
        );
        Ok(())
    }
}
