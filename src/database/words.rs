//! Word store operations
//!
//! Point queries, upserts, cache eviction, audio bookkeeping, and the
//! live-stream observers the rest of the pipeline builds on.

use std::future::Future;

use async_stream::stream;
use futures::stream::BoxStream;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::models::{AudioDownloadStatus, Word};

use super::records::{into_domain_words, WordRecord};
use super::{Change, Database, StoreResult, MAX_CACHED_WORDS};

/// Extension trait for word-related store operations.
pub trait WordStore {
    /// Case-insensitive point lookup by word text.
    fn get_word(&self, text: &str) -> impl Future<Output = StoreResult<Option<Word>>> + Send;

    /// Point lookup by dictionary id.
    fn get_word_by_id(&self, id: &str) -> impl Future<Output = StoreResult<Option<Word>>> + Send;

    /// All cached words, most recently fetched first.
    fn get_all_words(&self) -> impl Future<Output = StoreResult<Vec<Word>>> + Send;

    /// Members of a set, most recently fetched first.
    fn get_words_by_set_name(
        &self,
        set_name: &str,
    ) -> impl Future<Output = StoreResult<Vec<Word>>> + Send;

    fn word_count(&self) -> impl Future<Output = StoreResult<i64>> + Send;

    /// Upsert a single record (replace-on-conflict by id).
    fn insert_word(&self, record: &WordRecord) -> impl Future<Output = StoreResult<()>> + Send;

    /// Upsert a batch; a single notification fires after the batch lands.
    fn insert_words(&self, records: &[WordRecord])
        -> impl Future<Output = StoreResult<()>> + Send;

    fn clear_words(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Automatic trim: delete all but the `MAX_CACHED_WORDS`
    /// most-recently-timestamped words.
    fn keep_recent_words(&self) -> impl Future<Output = StoreResult<()>> + Send;

    fn update_audio_status(
        &self,
        word_id: &str,
        status: AudioDownloadStatus,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Record the local file path together with the new status.
    fn update_audio_info(
        &self,
        word_id: &str,
        audio_file_path: &str,
        status: AudioDownloadStatus,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Words carrying an audio URL whose download was never started.
    fn words_with_pending_audio(
        &self,
        limit: i64,
    ) -> impl Future<Output = StoreResult<Vec<WordRecord>>> + Send;

    /// Live stream of a word by text; re-emits on every store write.
    fn observe_word(&self, text: &str) -> BoxStream<'static, Option<Word>>;

    /// Live stream of a word by id.
    fn observe_word_by_id(&self, id: &str) -> BoxStream<'static, Option<Word>>;

    /// Live stream of all cached words, most recent first.
    fn observe_all_words(&self) -> BoxStream<'static, Vec<Word>>;

    /// Live stream of a set's members.
    fn observe_words_by_set_name(&self, set_name: &str) -> BoxStream<'static, Vec<Word>>;
}

impl WordStore for Database {
    async fn get_word(&self, text: &str) -> StoreResult<Option<Word>> {
        let record = sqlx::query_as::<_, WordRecord>(
            "SELECT * FROM words WHERE word = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(text)
        .fetch_optional(self.pool())
        .await?;
        record.map(WordRecord::into_domain).transpose()
    }

    async fn get_word_by_id(&self, id: &str) -> StoreResult<Option<Word>> {
        let record = sqlx::query_as::<_, WordRecord>("SELECT * FROM words WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        record.map(WordRecord::into_domain).transpose()
    }

    async fn get_all_words(&self) -> StoreResult<Vec<Word>> {
        let records =
            sqlx::query_as::<_, WordRecord>("SELECT * FROM words ORDER BY timestamp DESC")
                .fetch_all(self.pool())
                .await?;
        Ok(into_domain_words(records))
    }

    async fn get_words_by_set_name(&self, set_name: &str) -> StoreResult<Vec<Word>> {
        let records = sqlx::query_as::<_, WordRecord>(
            "SELECT * FROM words WHERE set_name = ? COLLATE NOCASE ORDER BY timestamp DESC",
        )
        .bind(set_name)
        .fetch_all(self.pool())
        .await?;
        Ok(into_domain_words(records))
    }

    async fn word_count(&self) -> StoreResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM words")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    async fn insert_word(&self, record: &WordRecord) -> StoreResult<()> {
        insert_record(self.pool(), record).await?;
        self.notify(Change::Words);
        Ok(())
    }

    async fn insert_words(&self, records: &[WordRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        // The batch commits atomically; the notification only fires for
        // rows that are actually durable.
        let mut tx = self.pool().begin().await?;
        for record in records {
            insert_record(&mut *tx, record).await?;
        }
        tx.commit().await?;
        self.notify(Change::Words);
        Ok(())
    }

    async fn clear_words(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM words").execute(self.pool()).await?;
        self.notify(Change::Words);
        Ok(())
    }

    async fn keep_recent_words(&self) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM words
            WHERE id NOT IN (
                SELECT id FROM words
                ORDER BY timestamp DESC
                LIMIT ?
            )
            "#,
        )
        .bind(MAX_CACHED_WORDS)
        .execute(self.pool())
        .await?;
        if result.rows_affected() > 0 {
            self.notify(Change::Words);
        }
        Ok(())
    }

    async fn update_audio_status(
        &self,
        word_id: &str,
        status: AudioDownloadStatus,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE words SET audio_download_status = ? WHERE id = ?")
            .bind(status.as_i64())
            .bind(word_id)
            .execute(self.pool())
            .await?;
        self.notify(Change::Words);
        Ok(())
    }

    async fn update_audio_info(
        &self,
        word_id: &str,
        audio_file_path: &str,
        status: AudioDownloadStatus,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE words SET audio_file_path = ?, audio_download_status = ? WHERE id = ?")
            .bind(audio_file_path)
            .bind(status.as_i64())
            .bind(word_id)
            .execute(self.pool())
            .await?;
        self.notify(Change::Words);
        Ok(())
    }

    async fn words_with_pending_audio(&self, limit: i64) -> StoreResult<Vec<WordRecord>> {
        let records = sqlx::query_as::<_, WordRecord>(
            r#"
            SELECT * FROM words
            WHERE audio_url IS NOT NULL
              AND audio_url != ''
              AND audio_download_status = ?
            LIMIT ?
            "#,
        )
        .bind(AudioDownloadStatus::Pending.as_i64())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }

    fn observe_word(&self, text: &str) -> BoxStream<'static, Option<Word>> {
        let db = self.clone();
        let text = text.to_string();
        Box::pin(stream! {
            let mut rx = db.subscribe();
            loop {
                match db.get_word(&text).await {
                    Ok(word) => yield word,
                    Err(e) => warn!(word = %text, "Live word query failed: {e}"),
                }
                if wait_for_change(&mut rx, Change::Words).await.is_none() {
                    return;
                }
            }
        })
    }

    fn observe_word_by_id(&self, id: &str) -> BoxStream<'static, Option<Word>> {
        let db = self.clone();
        let id = id.to_string();
        Box::pin(stream! {
            let mut rx = db.subscribe();
            loop {
                match db.get_word_by_id(&id).await {
                    Ok(word) => yield word,
                    Err(e) => warn!(word_id = %id, "Live word query failed: {e}"),
                }
                if wait_for_change(&mut rx, Change::Words).await.is_none() {
                    return;
                }
            }
        })
    }

    fn observe_all_words(&self) -> BoxStream<'static, Vec<Word>> {
        let db = self.clone();
        Box::pin(stream! {
            let mut rx = db.subscribe();
            loop {
                match db.get_all_words().await {
                    Ok(words) => yield words,
                    Err(e) => warn!("Live word-list query failed: {e}"),
                }
                if wait_for_change(&mut rx, Change::Words).await.is_none() {
                    return;
                }
            }
        })
    }

    fn observe_words_by_set_name(&self, set_name: &str) -> BoxStream<'static, Vec<Word>> {
        let db = self.clone();
        let set_name = set_name.to_string();
        Box::pin(stream! {
            let mut rx = db.subscribe();
            loop {
                match db.get_words_by_set_name(&set_name).await {
                    Ok(words) => yield words,
                    Err(e) => warn!(set = %set_name, "Live set query failed: {e}"),
                }
                if wait_for_change(&mut rx, Change::Words).await.is_none() {
                    return;
                }
            }
        })
    }
}

async fn insert_record<'a, E>(executor: E, record: &WordRecord) -> StoreResult<()>
where
    E: sqlx::Executor<'a, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO words
            (id, word, phonetics, definitions, timestamp, set_name,
             audio_url, audio_file_path, audio_download_status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.word)
    .bind(&record.phonetics)
    .bind(&record.definitions)
    .bind(record.timestamp)
    .bind(&record.set_name)
    .bind(&record.audio_url)
    .bind(&record.audio_file_path)
    .bind(record.audio_download_status)
    .execute(executor)
    .await?;
    Ok(())
}

/// Block until a matching change arrives. `None` means the store handle
/// was dropped and the stream should end. A lagged receiver re-queries
/// immediately rather than replaying missed notifications.
pub(crate) async fn wait_for_change(
    rx: &mut tokio::sync::broadcast::Receiver<Change>,
    wanted: Change,
) -> Option<()> {
    loop {
        match rx.recv().await {
            Ok(change) if change == wanted => return Some(()),
            Ok(_) => continue,
            Err(RecvError::Lagged(_)) => return Some(()),
            Err(RecvError::Closed) => return None,
        }
    }
}
