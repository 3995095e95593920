//! Durable queue-backed fetch strategy.
//!
//! Jobs are persisted to the `fetch_jobs` table before they run, so a fetch
//! started shortly before the process dies is re-run on the next start
//! (at-least-once). The worker task owns the network calls and batch-inserts
//! results; stream consumers subscribe to the store directly, which decouples
//! their completion from job scheduling.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use sqlx::Row;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::DictionaryApi;
use crate::database::{Database, SetStore, WordStore};
use crate::models::Word;

use super::{fetch_word_record, observe_set_cumulative, FetchError, WordFetchStrategy};

/// Fetch job lifecycle as persisted in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Durable background fetch queue with a single owned worker task.
pub struct FetchQueue {
    db: Database,
    tx: mpsc::UnboundedSender<String>,
}

impl FetchQueue {
    /// Persist-then-signal queue; the spawned worker drains job ids and
    /// performs the network and store work outside any caller's lifetime.
    pub fn start(db: Database, api: Arc<dyn DictionaryApi>, audio_base_url: String) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let worker_db = db.clone();
        tokio::spawn(async move {
            while let Some(job_id) = rx.recv().await {
                run_job(&worker_db, api.as_ref(), &audio_base_url, &job_id).await;
            }
        });
        Arc::new(Self { db, tx })
    }

    /// Persist a job row, then hand its id to the worker. The row lands
    /// before the signal so a crash in between leaves a resumable job.
    pub async fn enqueue(&self, set_name: &str, words: &[String]) -> Result<String, FetchError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO fetch_jobs (id, set_name, words, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&job_id)
        .bind(set_name)
        .bind(serde_json::to_string(words).map_err(crate::database::StoreError::from)?)
        .bind(JobStatus::Pending.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await
        .map_err(crate::database::StoreError::from)?;

        self.tx
            .send(job_id.clone())
            .map_err(|_| FetchError::QueueUnavailable)?;
        Ok(job_id)
    }

    /// Re-signal every job that never completed. Called at startup.
    pub async fn resume_pending(&self) -> Result<usize, FetchError> {
        let rows = sqlx::query("SELECT id FROM fetch_jobs WHERE status = ? ORDER BY created_at")
            .bind(JobStatus::Pending.as_str())
            .fetch_all(self.db.pool())
            .await
            .map_err(crate::database::StoreError::from)?;

        let mut resumed = 0;
        for row in &rows {
            let id: String = row
                .try_get("id")
                .map_err(crate::database::StoreError::from)?;
            if self.tx.send(id).is_err() {
                return Err(FetchError::QueueUnavailable);
            }
            resumed += 1;
        }
        if resumed > 0 {
            info!(resumed, "Resumed unfinished fetch jobs");
        }
        Ok(resumed)
    }

    /// Current persisted status of a job, if the job exists.
    pub async fn job_status(&self, job_id: &str) -> Result<Option<String>, FetchError> {
        let row = sqlx::query("SELECT status FROM fetch_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(crate::database::StoreError::from)?;
        Ok(row
            .map(|r| r.try_get("status"))
            .transpose()
            .map_err(crate::database::StoreError::from)?)
    }
}

async fn run_job(db: &Database, api: &dyn DictionaryApi, audio_base_url: &str, job_id: &str) {
    let row = match sqlx::query("SELECT set_name, words FROM fetch_jobs WHERE id = ?")
        .bind(job_id)
        .fetch_optional(db.pool())
        .await
    {
        Ok(Some(row)) => row,
        Ok(None) => {
            warn!(job_id, "Fetch job disappeared before running");
            return;
        }
        Err(e) => {
            error!(job_id, "Failed to load fetch job: {e}");
            return;
        }
    };

    let set_name: String = row.try_get("set_name").unwrap_or_default();
    let words: Vec<String> = row
        .try_get::<String, _>("words")
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();

    info!(job_id, set = %set_name, count = words.len(), "Running fetch job");

    let mut records = Vec::new();
    for word in &words {
        if let Some(record) = fetch_word_record(db, api, audio_base_url, &set_name, word).await {
            records.push(record);
        }
    }

    let status = match db.insert_words(&records).await {
        Ok(()) => JobStatus::Completed,
        Err(e) => {
            error!(job_id, "Failed to persist fetched words: {e}");
            JobStatus::Failed
        }
    };

    if let Err(e) = sqlx::query(
        "UPDATE fetch_jobs SET status = ?, completed_at = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(job_id)
    .execute(db.pool())
    .await
    {
        error!(job_id, "Failed to update fetch job status: {e}");
    }
}

/// Fetch strategy backed by the durable queue.
pub struct QueueWordFetchStrategy {
    db: Database,
    queue: Arc<FetchQueue>,
}

impl QueueWordFetchStrategy {
    pub fn new(db: Database, queue: Arc<FetchQueue>) -> Self {
        Self { db, queue }
    }
}

#[async_trait]
impl WordFetchStrategy for QueueWordFetchStrategy {
    async fn fetch_words(
        &self,
        set_name: &str,
        words: &[String],
    ) -> Result<BoxStream<'static, Vec<Word>>, FetchError> {
        self.db.create_set_if_missing(set_name).await?;
        self.queue.enqueue(set_name, words).await?;
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
