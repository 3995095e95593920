//! Dictionary Repository
//!
//! Offline-first facade the rest of an application talks to. Every read
//! surface is a stream of [`FetchResult`] values; cached data is preferred
//! over the network, and a network failure never poisons cached reads.
//! Word lookups write through to the local store, trigger pronunciation
//! downloads, and keep the stream open so audio completion is observable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{info, warn};

use crate::api::{map_entry, DictionaryApi};
use crate::audio::AudioDownloadManager;
use crate::database::{Database, SetStore, StoreResult, WordRecord, WordStore};
use crate::fetch::WordFetchStrategy;
use crate::models::{FetchResult, Word, WordSet};

/// Error message emitted when a lookup is attempted while offline.
pub const NETWORK_UNAVAILABLE_ERROR: &str = "Network is not available";
/// Error message emitted when the dictionary service has no entry.
pub const WORD_NOT_FOUND_ERROR: &str = "Word not found";
/// Prefix for transport-level lookup failures.
pub const NETWORK_ERROR_PREFIX: &str = "Network error: ";

/// How many words the recent-words view returns.
pub const RECENT_WORDS_LIMIT: usize = 10;
/// Manual cache clearing is a no-op at or below this many cached words.
pub const CLEAR_CACHE_THRESHOLD: i64 = 30;

/// Answers "is the network reachable right now". Checked before any
/// lookup that would hit the dictionary service.
pub trait ConnectivityProbe: Send + Sync {
    fn is_network_available(&self) -> bool;
}

/// Probe for environments without connectivity signals.
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_network_available(&self) -> bool {
        true
    }
}

/// Shared connectivity flag the embedding application can toggle as its
/// own network monitoring reports changes.
#[derive(Default)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl ConnectivityProbe for ConnectivityFlag {
    fn is_network_available(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

pub struct DictionaryRepository {
    db: Database,
    api: Arc<dyn DictionaryApi>,
    strategy: Arc<dyn WordFetchStrategy>,
    audio: Arc<AudioDownloadManager>,
    connectivity: Arc<dyn ConnectivityProbe>,
    audio_base_url: String,
}

impl DictionaryRepository {
    pub fn new(
        db: Database,
        api: Arc<dyn DictionaryApi>,
        strategy: Arc<dyn WordFetchStrategy>,
        audio: Arc<AudioDownloadManager>,
        connectivity: Arc<dyn ConnectivityProbe>,
        audio_base_url: String,
    ) -> Self {
        Self {
            db,
            api,
            strategy,
            audio,
            connectivity,
            audio_base_url,
        }
    }

    /// Look up a single word.
    ///
    /// Emits exactly one `Error` when offline, when the service has no
    /// entry, or when the request fails. On success the word is persisted
    /// (tagged with its own text as set name), the cache is trimmed, one
    /// `Success` is emitted, and — when the entry carries pronunciation
    /// audio — the stream stays open and re-emits the word when its
    /// download reaches a terminal state.
    pub fn get_word(&self, text: &str) -> BoxStream<'static, FetchResult<Word>> {
        let db = self.db.clone();
        let api = self.api.clone();
        let audio = self.audio.clone();
        let connectivity = self.connectivity.clone();
        let audio_base_url = self.audio_base_url.clone();
        let text = text.to_string();

        Box::pin(stream! {
            if !connectivity.is_network_available() {
                yield FetchResult::error(NETWORK_UNAVAILABLE_ERROR);
                return;
            }

            let entries = match api.get_word(&text.to_lowercase()).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(word = %text, "Word lookup failed: {e}");
                    yield FetchResult::error_with_cause(
                        format!("{NETWORK_ERROR_PREFIX}{e}"),
                        e,
                    );
                    return;
                }
            };
            let Some(entry) = entries.first() else {
                yield FetchResult::error(WORD_NOT_FOUND_ERROR);
                return;
            };

            let word = map_entry(entry, &text, &audio_base_url);

            // Single-word lookups are stored under the searched text so
            // they never pollute a learner-defined set.
            match WordRecord::from_domain(&word, &text) {
                Ok(record) => {
                    if let Err(e) = db.insert_word(&record).await {
                        warn!(word = %text, "Failed to cache word: {e}");
                    } else if let Err(e) = db.keep_recent_words().await {
                        warn!("Cache trim failed: {e}");
                    }
                }
                Err(e) => warn!(word = %text, "Failed to encode word for cache: {e}"),
            }

            yield FetchResult::Success(word.clone());

            let Some(url) = word.audio_url().map(str::to_string) else {
                return;
            };
            drop(audio.schedule_download(&word.id, &url));

            let mut last_status = word.audio_download_status;
            let mut updates = db.observe_word_by_id(&word.id);
            while let Some(current) = updates.next().await {
                let Some(current) = current else { continue };
                if current.audio_download_status == last_status {
                    continue;
                }
                last_status = current.audio_download_status;
                if last_status.is_terminal() {
                    yield FetchResult::Success(current);
                }
            }
        })
    }

    /// Live view of the most recently fetched words, capped at
    /// [`RECENT_WORDS_LIMIT`]. Never touches the network.
    pub fn get_cached_words(&self) -> BoxStream<'static, FetchResult<Vec<Word>>> {
        self.db
            .observe_all_words()
            .map(|mut words| {
                words.truncate(RECENT_WORDS_LIMIT);
                FetchResult::Success(words)
            })
            .boxed()
    }

    /// Live view of every stored set.
    pub fn get_cached_sets(&self) -> BoxStream<'static, FetchResult<Vec<WordSet>>> {
        self.db
            .observe_all_sets()
            .map(FetchResult::Success)
            .boxed()
    }

    /// Live view of a set's members. An unknown set yields an empty
    /// stream; only a storage failure produces an `Error`.
    pub fn get_words_by_set_name(
        &self,
        set_name: &str,
    ) -> BoxStream<'static, FetchResult<Vec<Word>>> {
        let strategy = self.strategy.clone();
        let set_name = set_name.to_string();
        Box::pin(stream! {
            match strategy.fetch_words_by_set_name(&set_name).await {
                Ok(mut inner) => {
                    while let Some(words) = inner.next().await {
                        yield FetchResult::Success(words);
                    }
                }
                Err(e) => {
                    yield FetchResult::error_with_cause(
                        format!("Failed to load words for set: {e}"),
                        e,
                    );
                }
            }
        })
    }

    /// Fetch a named batch of words into a set.
    ///
    /// If the set already has cached members they are emitted once and the
    /// network is never consulted. Otherwise the configured fetch strategy
    /// retrieves the batch and the stream emits the set's cumulative
    /// contents as words land.
    pub fn fetch_words_for_set(
        &self,
        set_name: &str,
        words: &[String],
    ) -> BoxStream<'static, FetchResult<Vec<Word>>> {
        let db = self.db.clone();
        let strategy = self.strategy.clone();
        let connectivity = self.connectivity.clone();
        let set_name = set_name.to_string();
        let words = words.to_vec();

        Box::pin(stream! {
            match db.get_words_by_set_name(&set_name).await {
                Ok(cached) if !cached.is_empty() => {
                    info!(set = %set_name, count = cached.len(), "Serving set from cache");
                    yield FetchResult::Success(cached);
                    return;
                }
                Ok(_) => {}
                Err(e) => warn!(set = %set_name, "Cache check failed, fetching: {e}"),
            }

            if !connectivity.is_network_available() {
                yield FetchResult::error(NETWORK_UNAVAILABLE_ERROR);
                return;
            }

            match strategy.fetch_words(&set_name, &words).await {
                Ok(mut inner) => {
                    while let Some(batch) = inner.next().await {
                        yield FetchResult::Success(batch);
                    }
                }
                Err(e) => {
                    yield FetchResult::error_with_cause(
                        format!("Failed to fetch words for set: {e}"),
                        e,
                    );
                }
            }
        })
    }

    /// Number of cached words.
    pub async fn cache_size(&self) -> StoreResult<i64> {
        self.db.word_count().await
    }

    /// Clear the word cache, but only once it has grown past
    /// [`CLEAR_CACHE_THRESHOLD`]. Returns whether anything was cleared.
    pub async fn clear_cache(&self) -> StoreResult<bool> {
        let count = self.db.word_count().await?;
        if count <= CLEAR_CACHE_THRESHOLD {
            return Ok(false);
        }
        self.db.clear_words().await?;
        info!(cleared = count, "Word cache cleared");
        Ok(true)
    }
}
