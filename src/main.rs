//! Catalog Sync - incremental Digimon TCG card mirror
//!
//! Runs one sync pass and exits: 0 on success, 1 when the run was aborted.

use catalog_sync::config::default_data_dir;
use catalog_sync::{sync_catalog, DetailMode, SyncConfig, SyncReport};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Incrementally mirror the Digimon card catalog and card art
#[derive(Parser, Debug)]
#[command(name = "catalog_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the snapshot and the images folder
    #[arg(short, long, default_value_os_t = default_data_dir())]
    data_dir: PathBuf,

    /// Snapshot file (default: <data-dir>/digimon_cards.json)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Image directory (default: <data-dir>/images)
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Base URL of the card API
    #[arg(long)]
    api_base: Option<String>,

    /// Only list cards from this series
    #[arg(long, conflicts_with = "all_series")]
    series: Option<String>,

    /// List cards from every series
    #[arg(long, default_value_t = false)]
    all_series: bool,

    /// Where a new card's stored record comes from
    #[arg(long, value_enum, default_value_t = DetailMode::Search)]
    detail_mode: DetailMode,

    /// Do not store the verbatim master list in the snapshot
    #[arg(long, default_value_t = false)]
    no_card_list: bool,

    /// Process at most this many new cards in this run
    #[arg(long)]
    limit: Option<usize>,

    /// Requests allowed per rate-limit window
    #[arg(long, default_value_t = 15)]
    max_requests: usize,

    /// Rate-limit window in seconds
    #[arg(long, default_value_t = 10)]
    window_secs: u64,

    /// Seconds to wait after an HTTP 429 before retrying
    #[arg(long, default_value_t = 30)]
    cooldown_secs: u64,

    /// Give up on a request after this many 429 retries (default: never)
    #[arg(long)]
    max_quota_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Fallback image URL, `{card}` is replaced by the card number
    #[arg(long)]
    image_url_template: Option<String>,
}

impl Args {
    fn into_config(self) -> SyncConfig {
        let mut config = SyncConfig::in_dir(&self.data_dir);

        if let Some(snapshot) = self.snapshot {
            config.snapshot_path = snapshot;
        }
        if let Some(image_dir) = self.image_dir {
            config.image_dir = image_dir;
        }
        if let Some(api_base) = self.api_base {
            config.api_base = api_base;
        }
        if self.all_series {
            config.series = None;
        } else if let Some(series) = self.series {
            config.series = Some(series);
        }

        config.detail_mode = self.detail_mode;
        config.keep_card_list = !self.no_card_list;
        config.max_new_cards = self.limit;
        config.rate_limit.max_requests = self.max_requests;
        config.rate_limit.window = Duration::from_secs(self.window_secs);
        config.quota_cooldown = Duration::from_secs(self.cooldown_secs);
        config.max_quota_retries = self.max_quota_retries;
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        config.image_url_template = self.image_url_template;
        config
    }
}

fn print_summary(report: &SyncReport) {
    println!("Update complete");
    println!("New cards added: {}", report.new_cards);
    println!("Total stored cards: {}", report.total_cards);
    if report.failed_cards > 0 || report.failed_images > 0 {
        println!(
            "Failures this run: {} cards, {} images",
            report.failed_cards, report.failed_images
        );
    }
    if report.deferred > 0 {
        println!("Deferred to next run: {}", report.deferred);
    }
}

fn main() {
    // Initialize logger. Set RUST_LOG environment variable to control log level.
    // Examples: RUST_LOG=info, RUST_LOG=debug, RUST_LOG=catalog_sync=trace
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();

    log::info!("Starting catalog sync...");
    log::info!("Snapshot path: {}", config.snapshot_path.display());
    log::info!("Image directory: {}", config.image_dir.display());

    match sync_catalog(config) {
        Ok(report) => print_summary(&report),
        Err(e) => {
            log::error!("Sync failed: {}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
