//! Direct fetch strategy.
//!
//! Performs lookups on spawned tasks tied to the running process, writing
//! each result as it completes. Used when durability across restarts is
//! not required; per-word fetches may interleave and complete out of
//! order, but every emitted snapshot is the store's current state.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::warn;

use crate::api::DictionaryApi;
use crate::database::{Database, SetStore, WordStore};
use crate::models::Word;

use super::{fetch_word_record, observe_set_cumulative, FetchError, WordFetchStrategy};

pub struct DirectWordFetchStrategy {
    db: Database,
    api: Arc<dyn DictionaryApi>,
    audio_base_url: String,
}

impl DirectWordFetchStrategy {
    pub fn new(db: Database, api: Arc<dyn DictionaryApi>, audio_base_url: String) -> Self {
        Self {
            db,
            api,
            audio_base_url,
        }
    }
}

#[async_trait]
impl WordFetchStrategy for DirectWordFetchStrategy {
    async fn fetch_words(
        &self,
        set_name: &str,
        words: &[String],
    ) -> Result<BoxStream<'static, Vec<Word>>, FetchError> {
        self.db.create_set_if_missing(set_name).await?;

        for word in words {
            let db = self.db.clone();
            let api = self.api.clone();
            let audio_base_url = self.audio_base_url.clone();
            let set_name = set_name.to_string();
            let word = word.clone();
            tokio::spawn(async move {
                if let Some(record) =
                    fetch_word_record(&db, api.as_ref(), &audio_base_url, &set_name, &word).await
                {
                    if let Err(e) = db.insert_word(&record).await {
                        warn!(word = %word, "Failed to persist fetched word: {e}");
                    }
                }
            });
        }

        Ok(observe_set_cumulative(&self.db, set_name))
    }

    async fn fetch_words_by_set_name(
        &self,
        set_name: &str,
    ) -> Result<BoxStream<'static, Vec<Word>>, FetchError> {
        if !self.db.set_exists(set_name).await? {
            return Ok(Box::pin(futures::stream::empty()));
        }
        Ok(self.db.observe_words_by_set_name(set_name))
    }

    async fn fetch_word(&self, _word: &str) -> Result<BoxStream<'static, Word>, FetchError> {
        Ok(Box::pin(futures::stream::empty()))
    }
}
