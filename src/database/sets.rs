//! Set store operations
//!
//! Sets are created lazily the first time a batch fetch names them and are
//! never deleted. The member count is denormalized and recomputed from the
//! distinct word texts tagged with the set name.

use std::future::Future;

use async_stream::stream;
use futures::stream::BoxStream;
use tracing::warn;

use crate::models::WordSet;

use super::records::SetRecord;
use super::words::wait_for_change;
use super::{Change, Database, StoreResult};

/// Extension trait for set-related store operations.
pub trait SetStore {
    /// All sets ordered by name.
    fn get_all_sets(&self) -> impl Future<Output = StoreResult<Vec<WordSet>>> + Send;

    /// Case-insensitive lookup by set name.
    fn get_set_by_name(&self, name: &str)
        -> impl Future<Output = StoreResult<Option<WordSet>>> + Send;

    fn set_exists(&self, name: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Create the set with a zero count unless it already exists.
    fn create_set_if_missing(&self, name: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Recompute the member count from the distinct word texts currently
    /// tagged with the set name.
    fn update_distinct_word_count(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Live stream of all sets, ordered by name.
    fn observe_all_sets(&self) -> BoxStream<'static, Vec<WordSet>>;
}

impl SetStore for Database {
    async fn get_all_sets(&self) -> StoreResult<Vec<WordSet>> {
        let records = sqlx::query_as::<_, SetRecord>("SELECT * FROM sets ORDER BY name ASC")
            .fetch_all(self.pool())
            .await?;
        Ok(records.into_iter().map(SetRecord::into_domain).collect())
    }

    async fn get_set_by_name(&self, name: &str) -> StoreResult<Option<WordSet>> {
        let record = sqlx::query_as::<_, SetRecord>(
            "SELECT * FROM sets WHERE name = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(record.map(SetRecord::into_domain))
    }

    async fn set_exists(&self, name: &str) -> StoreResult<bool> {
        let row: (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM sets WHERE name = ? COLLATE NOCASE)")
                .bind(name)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0 != 0)
    }

    async fn create_set_if_missing(&self, name: &str) -> StoreResult<()> {
        if self.set_exists(name).await? {
            return Ok(());
        }
        sqlx::query("INSERT OR IGNORE INTO sets (id, name, number_of_words) VALUES (?, ?, 0)")
            .bind(generate_set_id(name))
            .bind(name)
            .execute(self.pool())
            .await?;
        self.notify(Change::Sets);
        Ok(())
    }

    async fn update_distinct_word_count(&self, name: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE sets
            SET number_of_words = (
                SELECT COUNT(DISTINCT word)
                FROM words
                WHERE set_name = ? COLLATE NOCASE
            )
            WHERE name = ? COLLATE NOCASE
            "#,
        )
        .bind(name)
        .bind(name)
        .execute(self.pool())
        .await?;
        self.notify(Change::Sets);
        Ok(())
    }

    fn observe_all_sets(&self) -> BoxStream<'static, Vec<WordSet>> {
        let db = self.clone();
        Box::pin(stream! {
            let mut rx = db.subscribe();
            loop {
                match db.get_all_sets().await {
                    Ok(sets) => yield sets,
                    Err(e) => warn!("Live set-list query failed: {e}"),
                }
                if wait_for_change(&mut rx, Change::Sets).await.is_none() {
                    return;
                }
            }
        })
    }
}

/// Derived set identity: normalized name plus creation time.
fn generate_set_id(name: &str) -> String {
    format!(
        "set_{}_{}",
        name.to_lowercase().replace(' ', "_"),
        chrono::Utc::now().timestamp_millis()
    )
}
