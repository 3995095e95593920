//! Local Store
//!
//! SQLite persistence for word and set records with push-based change
//! notification: every committed write broadcasts an invalidation, and
//! open live queries re-run and push a fresh snapshot to subscribers.

mod migrations;
mod records;
mod sets;
mod words;

pub use records::{SetRecord, WordRecord};
pub use sets::SetStore;
pub use words::WordStore;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::broadcast;
use tracing::info;

/// Hard cache bound: the automatic trim keeps this many most-recently
/// timestamped words.
pub const MAX_CACHED_WORDS: i64 = 100;

/// Storage-layer error. Not part of the recoverable error taxonomy the
/// repository exposes; callers treat these as unexpected.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Which table a committed write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Words,
    Sets,
}

/// Shared handle to the local store. Cheap to clone; all clones share the
/// same pool and change broadcast.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    changes: broadcast::Sender<Change>,
}

impl Database {
    /// Open (or create) the store under `dir`.
    pub async fn new(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let options = SqliteConnectOptions::new()
            .filename(dir.join("dictionary.db"))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// In-memory store for tests and throwaway sessions.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // A single connection so every query sees the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        migrations::run_migrations(&pool).await?;
        let (changes, _) = broadcast::channel(64);
        info!("Local store ready");
        Ok(Self { pool, changes })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribe to write notifications. Live queries subscribe before
    /// their initial read so no write is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    /// Broadcast a committed write. Send failures just mean nobody is
    /// listening.
    pub(crate) fn notify(&self, change: Change) {
        let _ = self.changes.send(change);
    }
}

/// Block until the next committed word write. `None` means the store
/// handle was dropped.
pub(crate) async fn wait_for_words_change(
    rx: &mut broadcast::Receiver<Change>,
) -> Option<()> {
    words::wait_for_change(rx, Change::Words).await
}
