//! Domain models shared across the pipeline.
//!
//! These are the types that cross the repository boundary: words with their
//! phonetics and definitions, named word sets, the audio download state
//! machine, and the three-state `FetchResult` envelope every stream carries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A dictionary word with its definitions, phonetics, and audio state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    /// Stable dictionary key (the service's `meta.id`).
    pub id: String,
    /// The word text as searched.
    pub word: String,
    pub phonetics: Vec<Phonetic>,
    pub definitions: Vec<Definition>,
    /// Last-fetched time, unix milliseconds. Drives cache recency ordering.
    pub timestamp: i64,
    /// Local path of the downloaded pronunciation file.
    /// Non-null only when `audio_download_status` is `Completed`.
    pub audio_file_path: Option<String>,
    pub audio_download_status: AudioDownloadStatus,
}

impl Word {
    /// First pronunciation audio URL, if any phonetic carries one.
    pub fn audio_url(&self) -> Option<&str> {
        self.phonetics.iter().find_map(|p| p.audio_url.as_deref())
    }
}

/// Phonetic representation of a word.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phonetic {
    /// IPA text.
    pub text: String,
    /// URL to the pronunciation audio file.
    pub audio_url: Option<String>,
}

/// A single definition of a word.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    /// Grammatical category (noun, verb, ...).
    pub part_of_speech: String,
    pub meaning: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Per-word audio download state machine.
///
/// `Pending -> InProgress -> {Completed, Failed}`. Terminal states are
/// sticky; re-scheduling a download is the only way back to `InProgress`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioDownloadStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl AudioDownloadStatus {
    /// Integer form used in the store.
    pub fn as_i64(self) -> i64 {
        match self {
            AudioDownloadStatus::Pending => 0,
            AudioDownloadStatus::InProgress => 1,
            AudioDownloadStatus::Completed => 2,
            AudioDownloadStatus::Failed => 3,
        }
    }

    /// Unknown values decode as `Pending` so a sweep can pick them up.
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => AudioDownloadStatus::InProgress,
            2 => AudioDownloadStatus::Completed,
            3 => AudioDownloadStatus::Failed,
            _ => AudioDownloadStatus::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AudioDownloadStatus::Completed | AudioDownloadStatus::Failed
        )
    }
}

/// A named, de-duplicated collection of words a learner studies together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordSet {
    pub id: String,
    pub name: String,
    /// Count of distinct member words; recomputed after every batch insert.
    pub number_of_words: i64,
}

/// Uniform async result envelope for every stream the repository exposes.
///
/// Exactly one variant is active at a time; consumers are expected to
/// handle all three.
#[derive(Debug, Clone)]
pub enum FetchResult<T> {
    Success(T),
    Error {
        message: String,
        cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
    Loading,
}

impl<T> FetchResult<T> {
    pub fn error(message: impl Into<String>) -> Self {
        FetchResult::Error {
            message: message.into(),
            cause: None,
        }
    }

    pub fn error_with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        FetchResult::Error {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FetchResult::Error { .. })
    }

    /// Success payload, if any.
    pub fn into_success(self) -> Option<T> {
        match self {
            FetchResult::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            FetchResult::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}
