//! Remote dictionary service boundary.
//!
//! The pipeline consumes the service through the [`DictionaryApi`] trait:
//! a real client, and a mock that serves canned entries for offline
//! development. Response mapping and audio URL resolution live here too.

mod client;
mod mapper;
mod mock;
mod models;

pub use client::DictionaryClient;
pub use mapper::{audio_subdirectory, map_entry, resolve_audio_url};
pub use mock::CannedDictionaryApi;
pub use models::{DictionaryEntry, EntryDefinition, HeadwordInfo, Meta, Pronunciation, Sound};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Word lookup contract against the remote dictionary service.
///
/// Returns the raw entry list; an empty list means the service had no
/// structurally valid record for the word.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DictionaryApi: Send + Sync {
    async fn get_word(&self, word: &str) -> Result<Vec<DictionaryEntry>, ApiError>;
}
