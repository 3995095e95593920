//! Row records for the words and sets tables.
//!
//! Nested phonetics/definitions are persisted as JSON columns and decoded
//! back into domain types at the storage boundary.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{AudioDownloadStatus, Definition, Phonetic, Word, WordSet};

use super::StoreResult;

/// Word database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WordRecord {
    pub id: String,
    pub word: String,
    pub phonetics: String,   // JSON
    pub definitions: String, // JSON
    pub timestamp: i64,
    pub set_name: String,
    pub audio_url: Option<String>,
    pub audio_file_path: Option<String>,
    pub audio_download_status: i64,
}

impl WordRecord {
    /// Build a record from a domain word, tagging it with `set_name`.
    pub fn from_domain(word: &Word, set_name: &str) -> StoreResult<Self> {
        Ok(Self {
            id: word.id.clone(),
            word: word.word.clone(),
            phonetics: serde_json::to_string(&word.phonetics)?,
            definitions: serde_json::to_string(&word.definitions)?,
            timestamp: word.timestamp,
            set_name: set_name.to_string(),
            audio_url: word.audio_url().map(str::to_string),
            audio_file_path: word.audio_file_path.clone(),
            audio_download_status: word.audio_download_status.as_i64(),
        })
    }

    pub fn into_domain(self) -> StoreResult<Word> {
        let phonetics: Vec<Phonetic> = serde_json::from_str(&self.phonetics)?;
        let definitions: Vec<Definition> = serde_json::from_str(&self.definitions)?;
        Ok(Word {
            id: self.id,
            word: self.word,
            phonetics,
            definitions,
            timestamp: self.timestamp,
            audio_file_path: self.audio_file_path,
            audio_download_status: AudioDownloadStatus::from_i64(self.audio_download_status),
        })
    }
}

/// Set database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SetRecord {
    pub id: String,
    pub name: String,
    pub number_of_words: i64,
}

impl SetRecord {
    pub fn into_domain(self) -> WordSet {
        WordSet {
            id: self.id,
            name: self.name,
            number_of_words: self.number_of_words,
        }
    }
}

/// Decode a list of records, skipping rows whose JSON columns fail to
/// parse rather than failing the whole read.
pub(crate) fn into_domain_words(records: Vec<WordRecord>) -> Vec<Word> {
    records
        .into_iter()
        .filter_map(|record| match record.into_domain() {
            Ok(word) => Some(word),
            Err(e) => {
                tracing::warn!("Dropping undecodable word row: {e}");
                None
            }
        })
        .collect()
}
