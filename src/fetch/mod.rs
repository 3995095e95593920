//! Pluggable word-fetch strategies.
//!
//! Both variants honor the same contract: ensure the set exists, retrieve
//! the words not already cached, persist them, and stream the cumulative
//! contents of the set as writes land. The queue variant survives host
//! restarts; the direct variant trades durability for simpler control flow.

mod direct;
mod queue;

pub use direct::DirectWordFetchStrategy;
pub use queue::{FetchQueue, JobStatus, QueueWordFetchStrategy};

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::warn;

use crate::api::{map_entry, DictionaryApi};
use crate::database::{Database, SetStore, StoreError, WordRecord, WordStore};
use crate::models::Word;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("fetch queue is not running")]
    QueueUnavailable,
}

/// Strategy contract for retrieving word data.
#[async_trait]
pub trait WordFetchStrategy: Send + Sync {
    /// Ensure `set_name` exists, trigger retrieval of each listed word not
    /// yet cached, and stream the set's cumulative contents. The set's
    /// distinct-word count is recomputed as data settles.
    async fn fetch_words(
        &self,
        set_name: &str,
        words: &[String],
    ) -> Result<BoxStream<'static, Vec<Word>>, FetchError>;

    /// Stream the live contents of a known set. An unknown set yields an
    /// empty stream rather than an error.
    async fn fetch_words_by_set_name(
        &self,
        set_name: &str,
    ) -> Result<BoxStream<'static, Vec<Word>>, FetchError>;

    /// Single-word retrieval. Currently unsupported in both variants and
    /// kept as an empty stream pending product clarification.
    async fn fetch_word(&self, word: &str) -> Result<BoxStream<'static, Word>, FetchError>;
}

/// Picks the fetch strategy at composition time: queue-backed when a
/// durable queue backend exists, direct otherwise.
pub struct StrategySelector {
    db: Database,
    api: Arc<dyn DictionaryApi>,
    audio_base_url: String,
    queue: Option<Arc<FetchQueue>>,
}

impl StrategySelector {
    pub fn new(
        db: Database,
        api: Arc<dyn DictionaryApi>,
        audio_base_url: String,
        queue: Option<Arc<FetchQueue>>,
    ) -> Self {
        Self {
            db,
            api,
            audio_base_url,
            queue,
        }
    }

    pub fn select(&self) -> Arc<dyn WordFetchStrategy> {
        match &self.queue {
            Some(queue) => Arc::new(QueueWordFetchStrategy::new(self.db.clone(), queue.clone())),
            None => Arc::new(DirectWordFetchStrategy::new(
                self.db.clone(),
                self.api.clone(),
                self.audio_base_url.clone(),
            )),
        }
    }
}

/// Live stream over a set's members that refreshes the set's distinct-word
/// count before every emission, so consumers always see a count consistent
/// with the snapshot they receive.
pub(crate) fn observe_set_cumulative(
    db: &Database,
    set_name: &str,
) -> BoxStream<'static, Vec<Word>> {
    let db = db.clone();
    let set_name = set_name.to_string();
    Box::pin(stream! {
        let mut rx = db.subscribe();
        loop {
            match db.get_words_by_set_name(&set_name).await {
                Ok(words) => {
                    if let Err(e) = db.update_distinct_word_count(&set_name).await {
                        warn!(set = %set_name, "Failed to refresh set word count: {e}");
                    }
                    yield words;
                }
                Err(e) => warn!(set = %set_name, "Live set query failed: {e}"),
            }
            if crate::database::wait_for_words_change(&mut rx).await.is_none() {
                return;
            }
        }
    })
}

/// Look up one word and build its store record, tagged with `set_name`.
///
/// Returns `None` when the word is already cached, the service has no
/// record for it, or the lookup fails. Failures are logged only; a single
/// word never aborts its batch.
pub(crate) async fn fetch_word_record(
    db: &Database,
    api: &dyn DictionaryApi,
    audio_base_url: &str,
    set_name: &str,
    word: &str,
) -> Option<WordRecord> {
    match db.get_word(word).await {
        Ok(Some(_)) => return None,
        Ok(None) => {}
        Err(e) => {
            warn!(word, "Cache check failed, fetching anyway: {e}");
        }
    }

    let entries = match api.get_word(&word.to_lowercase()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(word, "Word lookup failed, skipping: {e}");
            return None;
        }
    };
    let Some(entry) = entries.first() else {
        warn!(word, "No dictionary record found, skipping");
        return None;
    };

    let domain = map_entry(entry, word, audio_base_url);
    match WordRecord::from_domain(&domain, set_name) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(word, "Failed to encode word record, skipping: {e}");
            None
        }
    }
}
