//! Serde models for the dictionary service's JSON responses.

use serde::{Deserialize, Serialize};

/// One entry of the response array for a word lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub meta: Meta,
    #[serde(rename = "hwi")]
    pub headword: HeadwordInfo,
    #[serde(rename = "def", default)]
    pub definitions: Vec<EntryDefinition>,
    /// Functional label (part of speech).
    #[serde(rename = "fl", default)]
    pub functional_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    /// Stable dictionary key for the entry.
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadwordInfo {
    #[serde(rename = "prs")]
    pub pronunciations: Option<Vec<Pronunciation>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pronunciation {
    /// Phonetic text.
    #[serde(rename = "mw", default)]
    pub text: String,
    pub sound: Option<Sound>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sound {
    /// Audio file token, resolved to a URL by the mapper.
    pub audio: Option<String>,
}

/// The sense sequence is deeply heterogeneous; it is kept as raw JSON and
/// flattened by the mapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDefinition {
    #[serde(rename = "sseq", default)]
    pub sense_sequence: serde_json::Value,
}
