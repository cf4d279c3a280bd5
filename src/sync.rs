//! Incremental catalog sync
//!
//! One run walks `Loading -> Listing -> Diffing -> Processing -> Finalizing -> Done`.
//! Only fatal errors (a blocked API, an unreadable snapshot, an unusable
//! master list) leave the loop early, and they do so before anything is
//! written, so the previous snapshot stays on disk untouched. Every other
//! failure is recorded against the card and the run moves on.

use crate::card::{self, image_url_from_template};
use crate::config::{DetailMode, SyncConfig};
use crate::error::{Result, SyncError};
use crate::image_cache::{ImageCache, ImageOutcome};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::transport::Transport;
use crate::utils::utc_timestamp;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

const CARD_LIST_ENDPOINT: &str = "getAllCards";
const SEARCH_ENDPOINT: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Loading,
    Listing,
    Diffing,
    Processing,
    Finalizing,
    Done,
    Fatal,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Loading => "loading",
            SyncPhase::Listing => "listing",
            SyncPhase::Diffing => "diffing",
            SyncPhase::Processing => "processing",
            SyncPhase::Finalizing => "finalizing",
            SyncPhase::Done => "done",
            SyncPhase::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Counts for one completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries in the master list
    pub listed: usize,
    /// Cards stored for the first time this run
    pub new_cards: usize,
    /// Entries already present in the snapshot
    pub known_skipped: usize,
    /// Entries without any card number field
    pub unidentified: usize,
    /// Novel cards left for a later run by `max_new_cards`
    pub deferred: usize,
    /// Detail failures this run
    pub failed_cards: usize,
    /// Image failures this run
    pub failed_images: usize,
    pub images_downloaded: usize,
    pub images_cached: usize,
    /// Cards in the saved snapshot
    pub total_cards: usize,
    pub last_updated: String,
}

/// A novel card picked out of the master list
struct NovelCard<'a> {
    index: usize,
    card_number: String,
    entry: &'a Value,
}

pub struct SyncEngine {
    config: SyncConfig,
    store: SnapshotStore,
    transport: Transport,
    images: ImageCache,
    phase: SyncPhase,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        store: SnapshotStore,
        transport: Transport,
        images: ImageCache,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            images,
            phase: SyncPhase::Idle,
        }
    }

    /// Wire up store, transport and image cache from `config` on real time
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let store = SnapshotStore::new(config.snapshot_path.clone());
        let transport = Transport::new(&config)?;
        let images = ImageCache::new(config.image_dir.clone(), &config.image_extension);
        Ok(Self::new(config, store, transport, images))
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Run one full pass. On error nothing has been written.
    pub fn run(&mut self) -> Result<SyncReport> {
        match self.run_phases() {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!("Sync aborted during {}: {}", self.phase, e);
                self.enter(SyncPhase::Fatal);
                Err(e)
            }
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        log::debug!("Sync phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn run_phases(&mut self) -> Result<SyncReport> {
        self.enter(SyncPhase::Loading);
        let mut snapshot = self.store.load()?;
        let known = snapshot.known_set();

        self.enter(SyncPhase::Listing);
        let card_list = self.fetch_card_list()?;

        self.enter(SyncPhase::Diffing);
        let mut report = SyncReport {
            listed: card_list.len(),
            ..SyncReport::default()
        };
        {
            let novel = self.diff(&card_list, &known, &mut report);
            log::info!(
                "{} new cards out of {} listed ({} already stored, {} unidentified)",
                novel.len(),
                report.listed,
                report.known_skipped,
                report.unidentified
            );

            self.enter(SyncPhase::Processing);
            for pending in &novel {
                self.process_card(pending, report.listed, &mut snapshot, &mut report)?;
            }
        }

        self.enter(SyncPhase::Finalizing);
        if self.config.keep_card_list {
            snapshot.card_list = Some(card_list);
        }
        snapshot.last_updated = Some(utc_timestamp());
        self.store.save(&mut snapshot)?;

        report.total_cards = snapshot.total_cards;
        report.last_updated = snapshot.last_updated.clone().unwrap_or_default();
        self.enter(SyncPhase::Done);

        log::info!(
            "Sync complete: {} new, {} total, {} card failures, {} image failures",
            report.new_cards,
            report.total_cards,
            report.failed_cards,
            report.failed_images
        );
        Ok(report)
    }

    /// Fetch the master list. Any failure here is fatal for the run.
    fn fetch_card_list(&mut self) -> Result<Vec<Value>> {
        let url = self.config.endpoint(CARD_LIST_ENDPOINT);
        let mut params = vec![("sort", "name"), ("sortdirection", "asc")];
        if let Some(series) = self.config.series.as_deref() {
            params.push(("series", series));
        }

        log::info!(
            "Fetching master card list (series: {})",
            self.config.series.as_deref().unwrap_or("all")
        );

        match self.transport.fetch_json(&url, &params) {
            Ok(Value::Array(cards)) => {
                log::info!("Master list has {} entries", cards.len());
                Ok(cards)
            }
            Ok(other) => {
                let shown: String = other.to_string().chars().take(200).collect();
                Err(SyncError::InvalidCardList(shown))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Err(SyncError::ListingFailed(Box::new(e))),
        }
    }

    /// Select novel cards in list order. `known` is the pre-run set and is
    /// never updated; repeats within this listing are tracked separately.
    fn diff<'a>(
        &self,
        card_list: &'a [Value],
        known: &HashSet<String>,
        report: &mut SyncReport,
    ) -> Vec<NovelCard<'a>> {
        let mut attempted: HashSet<String> = HashSet::new();
        let mut novel = Vec::new();

        for (index, entry) in card_list.iter().enumerate() {
            let Some(card_number) = card::card_number(entry) else {
                report.unidentified += 1;
                continue;
            };
            if known.contains(&card_number) {
                report.known_skipped += 1;
                continue;
            }
            if !attempted.insert(card_number.clone()) {
                log::debug!("{} listed more than once, skipping repeat", card_number);
                continue;
            }
            if self
                .config
                .max_new_cards
                .is_some_and(|limit| novel.len() >= limit)
            {
                report.deferred += 1;
                continue;
            }
            novel.push(NovelCard {
                index: index + 1,
                card_number,
                entry,
            });
        }

        if report.deferred > 0 {
            log::info!("{} new cards deferred to a later run", report.deferred);
        }
        novel
    }

    fn process_card(
        &mut self,
        novel: &NovelCard<'_>,
        listed: usize,
        snapshot: &mut Snapshot,
        report: &mut SyncReport,
    ) -> Result<()> {
        log::info!("[{}/{}] New card: {}", novel.index, listed, novel.card_number);

        let record = match self.fetch_record(novel) {
            Ok(record) => record,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Failed to fetch {}: {}", novel.card_number, e);
                snapshot.failed_cards.push(novel.card_number.clone());
                report.failed_cards += 1;
                return Ok(());
            }
        };

        let image_url = card::image_url(&record).or_else(|| {
            self.config
                .image_url_template
                .as_deref()
                .map(|template| image_url_from_template(template, &novel.card_number))
        });

        snapshot.insert(novel.card_number.clone(), record);
        report.new_cards += 1;

        match self
            .images
            .acquire(&mut self.transport, &novel.card_number, image_url.as_deref())
        {
            ImageOutcome::Downloaded { .. } => report.images_downloaded += 1,
            ImageOutcome::Cached => report.images_cached += 1,
            ImageOutcome::NoUrl => {
                log::debug!("No image URL for {}", novel.card_number);
            }
            ImageOutcome::Failed(_) => {
                snapshot.failed_images.push(novel.card_number.clone());
                report.failed_images += 1;
            }
        }
        Ok(())
    }

    /// The record to store for a novel card, per the configured detail mode
    fn fetch_record(&mut self, novel: &NovelCard<'_>) -> Result<Value> {
        match self.config.detail_mode {
            DetailMode::ListEntry => Ok(novel.entry.clone()),
            DetailMode::Search => {
                let url = self.config.endpoint(SEARCH_ENDPOINT);
                let detail = self
                    .transport
                    .fetch_json(&url, &[("card", novel.card_number.as_str())])?;
                if card::detail_entry(&detail).is_none() {
                    return Err(SyncError::EmptyDetail(novel.card_number.clone()));
                }
                Ok(detail)
            }
        }
    }
}

/// Run one sync pass with the given configuration on real time
pub fn sync_catalog(config: SyncConfig) -> Result<SyncReport> {
    SyncEngine::from_config(config)?.run()
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
