//! Test Fixtures
//!
//! Provides shared helpers for creating test databases, sample words,
//! canned dictionary entries, and wired-up repositories.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tempfile::TempDir;

use crate::api::{
    DictionaryApi, DictionaryEntry, EntryDefinition, HeadwordInfo, Meta, Pronunciation, Sound,
};
use crate::audio::AudioDownloadManager;
use crate::database::{Database, WordRecord, WordStore};
use crate::fetch::{DirectWordFetchStrategy, WordFetchStrategy};
use crate::models::{AudioDownloadStatus, Definition, Phonetic, Word};
use crate::repository::{ConnectivityFlag, DictionaryRepository};

/// Audio base URL used where no real transfer is expected.
pub const TEST_AUDIO_BASE: &str = "https://media.example.com/audio";

// =============================================================================
// Database Fixtures
// =============================================================================

/// Create a test database in a temporary directory.
/// Returns both the database and the TempDir (which must be kept alive).
pub async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db = Database::new(temp_dir.path())
        .await
        .expect("Failed to create test database");
    (db, temp_dir)
}

// =============================================================================
// Word Fixtures
// =============================================================================

/// A word with one phonetic (no audio) and one definition.
pub fn sample_word(id: &str, text: &str, timestamp: i64) -> Word {
    Word {
        id: id.to_string(),
        word: text.to_string(),
        phonetics: vec![Phonetic {
            text: format!("ˈ{text}"),
            audio_url: None,
        }],
        definitions: vec![Definition {
            part_of_speech: "noun".to_string(),
            meaning: format!("a {text}"),
            examples: Vec::new(),
        }],
        timestamp,
        audio_file_path: None,
        audio_download_status: AudioDownloadStatus::Pending,
    }
}

/// A store record for [`sample_word`] tagged with `set_name`.
pub fn sample_record(id: &str, text: &str, set_name: &str, timestamp: i64) -> WordRecord {
    WordRecord::from_domain(&sample_word(id, text, timestamp), set_name)
        .expect("Failed to encode sample record")
}

/// An audio manager writing under the temp dir with a short timeout.
pub fn create_audio_manager(db: &Database, temp: &TempDir) -> AudioDownloadManager {
    AudioDownloadManager::new(
        db.clone(),
        temp.path().join("audio"),
        Duration::from_secs(5),
    )
    .expect("Failed to create audio manager")
}

/// A store record whose phonetic carries `audio_url`, download pending.
pub fn record_with_audio(
    id: &str,
    text: &str,
    set_name: &str,
    audio_url: &str,
    timestamp: i64,
) -> WordRecord {
    let mut word = sample_word(id, text, timestamp);
    word.phonetics[0].audio_url = Some(audio_url.to_string());
    WordRecord::from_domain(&word, set_name).expect("Failed to encode sample record")
}

/// A raw service entry for `id`, optionally carrying an audio token.
pub fn sample_entry(id: &str, audio_token: Option<&str>) -> DictionaryEntry {
    DictionaryEntry {
        meta: Meta { id: id.to_string() },
        headword: HeadwordInfo {
            pronunciations: Some(vec![Pronunciation {
                text: format!("ˈ{id}"),
                sound: audio_token.map(|token| Sound {
                    audio: Some(token.to_string()),
                }),
            }]),
        },
        definitions: vec![EntryDefinition {
            sense_sequence: serde_json::json!([[[
                "sense",
                { "dt": [["text", format!("{{bc}}a {id}")]] }
            ]]]),
        }],
        functional_label: "noun".to_string(),
    }
}

// =============================================================================
// Repository Fixtures
// =============================================================================

/// A repository wired over a fresh database with a direct fetch strategy.
/// The TempDir must be kept alive for the duration of the test.
pub struct TestRepository {
    pub repository: DictionaryRepository,
    pub db: Database,
    pub connectivity: Arc<ConnectivityFlag>,
    pub _temp: TempDir,
}

pub async fn create_test_repository(api: Arc<dyn DictionaryApi>, online: bool) -> TestRepository {
    create_test_repository_with_audio_base(api, online, TEST_AUDIO_BASE).await
}

pub async fn create_test_repository_with_audio_base(
    api: Arc<dyn DictionaryApi>,
    online: bool,
    audio_base_url: &str,
) -> TestRepository {
    let (db, temp) = create_test_db().await;
    let connectivity = Arc::new(ConnectivityFlag::new(online));
    let audio = Arc::new(create_audio_manager(&db, &temp));
    let strategy: Arc<dyn WordFetchStrategy> = Arc::new(DirectWordFetchStrategy::new(
        db.clone(),
        api.clone(),
        audio_base_url.to_string(),
    ));
    let repository = DictionaryRepository::new(
        db.clone(),
        api,
        strategy,
        audio,
        connectivity.clone(),
        audio_base_url.to_string(),
    );
    TestRepository {
        repository,
        db,
        connectivity,
        _temp: temp,
    }
}

// =============================================================================
// Async Helpers
// =============================================================================

/// Next stream item, failing the test if nothing arrives within `secs`.
pub async fn next_within<T>(
    stream: &mut (impl Stream<Item = T> + Unpin),
    secs: u64,
) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(secs), stream.next())
        .await
        .expect("Timed out waiting for stream item")
}

/// Poll the store until the word reaches `status`, failing after 5s.
pub async fn wait_for_audio_status(
    db: &Database,
    word_id: &str,
    status: AudioDownloadStatus,
) -> Word {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(word) = db.get_word_by_id(word_id).await.expect("Word lookup failed") {
            if word.audio_download_status == status {
                return word;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for audio status {status:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
