//! Tests for the image cache.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{ImageCache, ImageOutcome};
use crate::clock::ManualClock;
use crate::config::SyncConfig;
use crate::transport::Transport;

fn create_test_cache() -> (ImageCache, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let cache = ImageCache::new(temp_dir.path().join("images"), "jpg");
    (cache, temp_dir)
}

/// Runs `acquire` calls on a blocking transport pointed at `base_url`.
async fn acquire_all(
    cache: Arc<ImageCache>,
    base_url: String,
    calls: Vec<(&'static str, Option<String>)>,
) -> (Vec<ImageOutcome>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let transport_clock = clock.clone();
    let outcomes = tokio::task::spawn_blocking(move || {
        let mut config = SyncConfig::in_dir(Path::new("."));
        config.api_base = base_url;
        config.request_timeout = Duration::from_secs(5);
        let mut transport = Transport::with_clock(&config, transport_clock).unwrap();
        calls
            .into_iter()
            .map(|(card, url)| cache.acquire(&mut transport, card, url.as_deref()))
            .collect::<Vec<_>>()
    })
    .await
    .unwrap();
    (outcomes, clock)
}

#[test]
fn test_filename_format() {
    let (cache, _temp_dir) = create_test_cache();
    assert!(cache.image_path("BT1-001").ends_with("BT1-001.jpg"));
}

#[test]
fn test_filename_replaces_separators() {
    let (cache, _temp_dir) = create_test_cache();
    let path = cache.image_path("P-001/alt");
    assert!(path.ends_with("P-001_alt.jpg"));
    assert_eq!(path.parent().unwrap(), cache.image_dir());
}

#[test]
fn test_extension_leading_dot_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let cache = ImageCache::new(temp_dir.path(), ".png");
    assert!(cache.image_path("ST1-01").ends_with("ST1-01.png"));
}

#[test]
fn test_new_creates_directory() {
    let (cache, _temp_dir) = create_test_cache();
    assert!(cache.image_dir().is_dir());
    assert!(!cache.contains("BT1-001"));
}

#[tokio::test]
async fn acquire_twice_downloads_once() {
    let mock_server = MockServer::start().await;
    let jpeg = vec![0xFF, 0xD8, 0xFF];

    Mock::given(method("GET"))
        .and(path("/cards/BT1-001.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (cache, _temp_dir) = create_test_cache();
    let cache = Arc::new(cache);
    let url = format!("{}/cards/BT1-001.jpg", mock_server.uri());
    let (outcomes, _clock) = acquire_all(
        cache.clone(),
        mock_server.uri(),
        vec![("BT1-001", Some(url.clone())), ("BT1-001", Some(url))],
    )
    .await;

    assert!(matches!(outcomes[0], ImageOutcome::Downloaded { bytes: 3 }));
    assert!(matches!(outcomes[1], ImageOutcome::Cached));
    assert_eq!(std::fs::read(cache.image_path("BT1-001")).unwrap(), jpeg);
}

#[tokio::test]
async fn existing_file_is_never_overwritten() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9, 9, 9]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (cache, _temp_dir) = create_test_cache();
    std::fs::write(cache.image_path("BT1-002"), [1, 2]).unwrap();
    let cache = Arc::new(cache);
    let url = format!("{}/cards/BT1-002.jpg", mock_server.uri());
    let (outcomes, _clock) =
        acquire_all(cache.clone(), mock_server.uri(), vec![("BT1-002", Some(url))]).await;

    assert!(matches!(outcomes[0], ImageOutcome::Cached));
    assert_eq!(std::fs::read(cache.image_path("BT1-002")).unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn missing_url_is_noop() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (cache, _temp_dir) = create_test_cache();
    let cache = Arc::new(cache);
    let (outcomes, _clock) = acquire_all(
        cache.clone(),
        mock_server.uri(),
        vec![("BT1-003", None), ("BT1-003", Some("  ".to_string()))],
    )
    .await;

    assert!(outcomes.iter().all(|o| matches!(o, ImageOutcome::NoUrl)));
    assert!(!cache.contains("BT1-003"));
}

#[tokio::test]
async fn http_error_is_recorded_not_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/BT1-004.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (cache, _temp_dir) = create_test_cache();
    let cache = Arc::new(cache);
    let url = format!("{}/cards/BT1-004.jpg", mock_server.uri());
    let (outcomes, _clock) =
        acquire_all(cache.clone(), mock_server.uri(), vec![("BT1-004", Some(url))]).await;

    assert!(outcomes[0].is_failure());
    assert!(!cache.contains("BT1-004"));
}

#[tokio::test]
async fn quota_exceeded_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/BT1-005.jpg"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cards/BT1-005.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 16]))
        .mount(&mock_server)
        .await;

    let (cache, _temp_dir) = create_test_cache();
    let cache = Arc::new(cache);
    let url = format!("{}/cards/BT1-005.jpg", mock_server.uri());
    let (outcomes, clock) =
        acquire_all(cache.clone(), mock_server.uri(), vec![("BT1-005", Some(url))]).await;

    assert!(matches!(outcomes[0], ImageOutcome::Downloaded { bytes: 16 }));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);
    assert!(cache.contains("BT1-005"));
}
