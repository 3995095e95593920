//! Composition root.
//!
//! Wires the store, the dictionary service client, the durable fetch
//! queue, and the audio download manager into a ready-to-use
//! [`DictionaryRepository`], resuming any work interrupted by a previous
//! shutdown.

use std::sync::Arc;

use tracing::info;

use crate::api::{ApiError, CannedDictionaryApi, DictionaryApi, DictionaryClient};
use crate::audio::{AudioDownloadManager, AudioError, PENDING_DOWNLOAD_BATCH};
use crate::config::WordWellConfig;
use crate::database::{Database, StoreError};
use crate::fetch::{FetchError, FetchQueue, StrategySelector};
use crate::repository::{AlwaysOnline, ConnectivityProbe, DictionaryRepository};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A fully wired pipeline instance.
pub struct WordWell {
    config: WordWellConfig,
    db: Database,
    repository: Arc<DictionaryRepository>,
    audio: Arc<AudioDownloadManager>,
    queue: Arc<FetchQueue>,
}

impl WordWell {
    /// Open the pipeline with no connectivity signal (assumed online).
    pub async fn open(config: WordWellConfig) -> Result<Self, ServerError> {
        Self::open_with_connectivity(config, Arc::new(AlwaysOnline)).await
    }

    /// Open the pipeline with an application-provided connectivity probe.
    ///
    /// Startup recovery runs here: fetch jobs that never completed are
    /// re-signalled, and a bounded batch of words with undownloaded audio
    /// is scheduled.
    pub async fn open_with_connectivity(
        config: WordWellConfig,
        connectivity: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self, ServerError> {
        let db = Database::new(&config.data_dir()).await?;

        let api: Arc<dyn DictionaryApi> = if config.api.use_mock {
            Arc::new(CannedDictionaryApi::new(
                config.api.mock_url.clone(),
                config.request_timeout(),
            )?)
        } else {
            Arc::new(DictionaryClient::new(&config.api)?)
        };

        let queue = FetchQueue::start(
            db.clone(),
            api.clone(),
            config.api.audio_base_url.clone(),
        );
        queue.resume_pending().await?;

        let strategy = StrategySelector::new(
            db.clone(),
            api.clone(),
            config.api.audio_base_url.clone(),
            Some(queue.clone()),
        )
        .select();

        let audio = Arc::new(AudioDownloadManager::new(
            db.clone(),
            config.audio_dir(),
            config.request_timeout(),
        )?);
        audio.process_pending_downloads(PENDING_DOWNLOAD_BATCH).await?;

        let repository = Arc::new(DictionaryRepository::new(
            db.clone(),
            api,
            strategy,
            audio.clone(),
            connectivity,
            config.api.audio_base_url.clone(),
        ));

        info!(data_dir = %config.data_dir().display(), "WordWell ready");
        Ok(Self {
            config,
            db,
            repository,
            audio,
            queue,
        })
    }

    pub fn repository(&self) -> &Arc<DictionaryRepository> {
        &self.repository
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn audio(&self) -> &Arc<AudioDownloadManager> {
        &self.audio
    }

    pub fn queue(&self) -> &Arc<FetchQueue> {
        &self.queue
    }

    pub fn config(&self) -> &WordWellConfig {
        &self.config
    }

    /// Stop in-flight audio transfers. Pending fetch jobs stay persisted
    /// and resume on the next open.
    pub fn shutdown(&self) {
        self.audio.cancel_all();
    }
}
