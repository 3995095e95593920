//! Integration tests for the fetch-and-cache pipeline.
//!
//! Exercises the public composition root with the canned dictionary
//! service: lookup → cache → audio download, queue-backed batch fetches,
//! and persistence across reopen.
//!
//! Run these tests with:
//! ```bash
//! cargo test --test pipeline_integration_test
//! ```

use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wordwell::database::WordStore;
use wordwell::models::AudioDownloadStatus;
use wordwell::{FetchResult, WordWell, WordWellConfig};

fn test_config(temp: &TempDir, audio_base_url: &str) -> WordWellConfig {
    let mut config = WordWellConfig::default();
    config.data.data_dir = Some(temp.path().to_path_buf());
    config.api.use_mock = true;
    config.api.audio_base_url = audio_base_url.to_string();
    config
}

async fn next_within<T>(stream: &mut BoxStream<'static, T>, secs: u64) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(secs), stream.next())
        .await
        .expect("Timed out waiting for stream item")
}

fn success<T>(item: Option<FetchResult<T>>) -> T {
    item.expect("Stream ended early")
        .into_success()
        .expect("Expected success")
}

#[tokio::test]
async fn test_lookup_roundtrip_with_audio() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let server = MockServer::start().await;
    // The canned "computer" entry carries the comput06 audio token.
    Mock::given(method("GET"))
        .and(path("/c/comput06.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
        .mount(&server)
        .await;

    let well = WordWell::open(test_config(&temp, &server.uri()))
        .await
        .expect("Failed to open pipeline");

    let mut stream = well.repository().get_word("computer");
    let word = success(next_within(&mut stream, 5).await);
    assert_eq!(word.word, "computer");
    assert_eq!(
        word.definitions[0].meaning,
        "an automatic electronic machine that can store and process data"
    );

    let downloaded = success(next_within(&mut stream, 5).await);
    assert_eq!(
        downloaded.audio_download_status,
        AudioDownloadStatus::Completed
    );

    assert!(well
        .database()
        .get_word("computer")
        .await
        .expect("Failed to get word")
        .is_some());
    well.shutdown();
}

#[tokio::test]
async fn test_batch_fetch_through_durable_queue() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let well = WordWell::open(test_config(&temp, "http://127.0.0.1:9"))
        .await
        .expect("Failed to open pipeline");

    let mut stream = well
        .repository()
        .fetch_words_for_set("Tech", &["laptop".to_string()]);
    loop {
        let snapshot = success(next_within(&mut stream, 5).await);
        if snapshot.len() == 1 {
            assert_eq!(snapshot[0].word, "laptop");
            break;
        }
    }

    let sets = success(next_within(&mut well.repository().get_cached_sets(), 5).await);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].name, "Tech");
    well.shutdown();
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let temp = TempDir::new().expect("Failed to create temp directory");

    {
        let well = WordWell::open(test_config(&temp, "http://127.0.0.1:9"))
            .await
            .expect("Failed to open pipeline");
        let mut stream = well.repository().get_word("computer");
        success(next_within(&mut stream, 5).await);
        well.shutdown();
    }

    let reopened = WordWell::open(test_config(&temp, "http://127.0.0.1:9"))
        .await
        .expect("Failed to reopen pipeline");
    assert!(reopened
        .database()
        .get_word("computer")
        .await
        .expect("Failed to get word")
        .is_some());
    reopened.shutdown();
}
