//! Audio Download Coordinator
//!
//! Downloads pronunciation files referenced by word records, decoupled
//! from the lookup path. At most one transfer is active per word id at any
//! time: a claim on a shared map is taken before spawning and released
//! when the transfer finishes, whatever the outcome. Transfers are
//! fire-and-forget relative to the caller — cancelling a lookup stream
//! does not stop an audio download; only `cancel`/`cancel_all` do.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::database::{Database, StoreResult, WordStore};
use crate::models::{AudioDownloadStatus, FetchResult, Word};

const AUDIO_FILE_EXTENSION: &str = "mp3";

/// Default batch size for the pending-download catch-up sweep.
pub const PENDING_DOWNLOAD_BATCH: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("download error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An in-flight transfer's entry in the dedup map. The generation ties a
/// release back to the exact claim that spawned it.
struct Claim {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct AudioDownloadManager {
    db: Database,
    client: Client,
    audio_dir: PathBuf,
    active: Arc<Mutex<HashMap<String, Claim>>>,
    generations: AtomicU64,
}

impl AudioDownloadManager {
    pub fn new(db: Database, audio_dir: PathBuf, timeout: Duration) -> Result<Self, AudioError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            db,
            client,
            audio_dir,
            active: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        })
    }

    /// Schedule a download for `word_id` and return a live stream of the
    /// word's cached state, starting with the current (pre-download)
    /// record so the caller is never blocked on the network.
    ///
    /// If a transfer for this word is already active the call is a no-op
    /// and the returned stream ends immediately.
    pub fn schedule_download(
        &self,
        word_id: &str,
        audio_url: &str,
    ) -> BoxStream<'static, FetchResult<Word>> {
        if !self.claim_and_spawn(word_id, audio_url) {
            debug!(word_id, "Download already in progress, skipping");
            return futures::stream::empty().boxed();
        }
        self.db
            .observe_word_by_id(word_id)
            .filter_map(|word| std::future::ready(word.map(FetchResult::Success)))
            .boxed()
    }

    /// Sweep the store for words whose audio was never fetched and
    /// schedule each, bounded by `limit`. Used as a catch-up at startup.
    pub async fn process_pending_downloads(&self, limit: i64) -> StoreResult<usize> {
        let pending = self.db.words_with_pending_audio(limit).await?;
        info!(count = pending.len(), "Processing pending audio downloads");
        let mut scheduled = 0;
        for record in pending {
            let Some(url) = record.audio_url.filter(|u| !u.is_empty()) else {
                continue;
            };
            if self.claim_and_spawn(&record.id, &url) {
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }

    /// Cancel the in-flight transfer for one word, if any.
    pub fn cancel(&self, word_id: &str) {
        let claim = self
            .active
            .lock()
            .expect("download tracking lock poisoned")
            .remove(word_id);
        if let Some(claim) = claim {
            claim.handle.abort();
            info!(word_id, "Cancelled audio download");
        }
    }

    /// Cancel every in-flight transfer and clear the dedup tracking.
    pub fn cancel_all(&self) {
        let mut active = self.active.lock().expect("download tracking lock poisoned");
        for (word_id, claim) in active.drain() {
            claim.handle.abort();
            debug!(word_id = %word_id, "Cancelled audio download");
        }
    }

    /// Number of transfers currently claimed.
    pub fn active_downloads(&self) -> usize {
        self.active
            .lock()
            .expect("download tracking lock poisoned")
            .len()
    }

    /// Atomically claim the word id and launch its transfer. Returns false
    /// when another transfer already holds the claim. The spawn happens
    /// under the lock so no second caller can win the same id.
    fn claim_and_spawn(&self, word_id: &str, audio_url: &str) -> bool {
        let mut active = self.active.lock().expect("download tracking lock poisoned");
        if active.contains_key(word_id) {
            return false;
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let db = self.db.clone();
        let client = self.client.clone();
        let audio_dir = self.audio_dir.clone();
        let tracking = Arc::clone(&self.active);
        let id = word_id.to_string();
        let url = audio_url.to_string();

        let handle = tokio::spawn(async move {
            transfer(&db, &client, &audio_dir, &id, &url).await;
            release_claim(&tracking, &id, generation);
        });
        active.insert(word_id.to_string(), Claim { generation, handle });
        true
    }
}

/// Release `word_id` only while the map still holds the claim identified
/// by `generation`. A task finishing after a cancel must not evict a
/// successor that claimed the same id in the meantime.
fn release_claim(active: &Mutex<HashMap<String, Claim>>, word_id: &str, generation: u64) {
    let mut active = active.lock().expect("download tracking lock poisoned");
    if active
        .get(word_id)
        .is_some_and(|claim| claim.generation == generation)
    {
        active.remove(word_id);
    }
}

/// Perform one transfer and record the outcome. Errors never escape:
/// the word's status field is the only observable effect of failure.
async fn transfer(db: &Database, client: &Client, audio_dir: &Path, word_id: &str, url: &str) {
    if let Err(e) = db
        .update_audio_status(word_id, AudioDownloadStatus::InProgress)
        .await
    {
        error!(word_id, "Failed to mark download in progress: {e}");
    }

    match download_file(client, audio_dir, word_id, url).await {
        Ok(path) => {
            info!(word_id, path = %path.display(), "Audio download completed");
            if let Err(e) = db
                .update_audio_info(
                    word_id,
                    &path.to_string_lossy(),
                    AudioDownloadStatus::Completed,
                )
                .await
            {
                error!(word_id, "Failed to record completed download: {e}");
            }
        }
        Err(e) => {
            warn!(word_id, "Audio download failed: {e}");
            if let Err(e) = db
                .update_audio_status(word_id, AudioDownloadStatus::Failed)
                .await
            {
                error!(word_id, "Failed to record failed download: {e}");
            }
        }
    }
}

async fn download_file(
    client: &Client,
    audio_dir: &Path,
    word_id: &str,
    url: &str,
) -> Result<PathBuf, AudioError> {
    tokio::fs::create_dir_all(audio_dir).await?;
    let dest = audio_dir.join(file_name_for(word_id, url));
    debug!(url, dest = %dest.display(), "Downloading audio");

    let response = client.get(url).send().await?.error_for_status()?;
    let mut file = tokio::fs::File::create(&dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(dest)
}

/// Target file name: the URL's file name with the query stripped and a
/// default extension appended when missing, else `<word_id>.mp3`.
fn file_name_for(word_id: &str, audio_url: &str) -> String {
    let from_url = url::Url::parse(audio_url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.rev().find(|s| !s.is_empty()).map(str::to_string))
    });
    match from_url {
        Some(mut name) => {
            if !name.contains('.') {
                name.push('.');
                name.push_str(AUDIO_FILE_EXTENSION);
            }
            name
        }
        None => format!("{word_id}.{AUDIO_FILE_EXTENSION}"),
    }
}
