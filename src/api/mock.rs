//! Mock dictionary service for offline development.
//!
//! Serves one of several canned response sets pulled from a mock endpoint,
//! and falls back to a hardcoded payload when that endpoint is missing or
//! unreachable.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use tracing::{debug, warn};

use super::models::DictionaryEntry;
use super::{ApiError, DictionaryApi};

/// Number of canned response sets the mock endpoint carries.
const CANNED_SET_COUNT: usize = 5;

pub struct CannedDictionaryApi {
    client: Client,
    mock_url: Option<String>,
}

impl CannedDictionaryApi {
    pub fn new(mock_url: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, mock_url })
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<DictionaryEntry>, ApiError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let value: serde_json::Value = response.json().await?;

        let index = rand::thread_rng().gen_range(0..CANNED_SET_COUNT);
        let entries: Vec<DictionaryEntry> = value
            .get("words")
            .and_then(|words| words.get(index))
            .and_then(|set| set.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        if entries.is_empty() {
            return Err(ApiError::InvalidResponse(format!(
                "mock endpoint returned no usable entries at index {index}"
            )));
        }
        Ok(entries)
    }

    fn fallback_entries() -> Vec<DictionaryEntry> {
        serde_json::from_str(FALLBACK_PAYLOAD)
            .expect("hardcoded mock payload must parse")
    }
}

#[async_trait]
impl DictionaryApi for CannedDictionaryApi {
    async fn get_word(&self, word: &str) -> Result<Vec<DictionaryEntry>, ApiError> {
        debug!(word, "Serving mock dictionary lookup");
        if let Some(url) = &self.mock_url {
            match self.fetch_remote(url).await {
                Ok(entries) => return Ok(entries),
                Err(e) => warn!("Mock endpoint unavailable, using fallback payload: {e}"),
            }
        }
        Ok(Self::fallback_entries())
    }
}

/// Hardcoded response used when no mock endpoint is reachable.
const FALLBACK_PAYLOAD: &str = r#"[
  {
    "meta": {"id": "computer"},
    "hwi": {
      "hw": "com*put*er",
      "prs": [{"mw": "kəm-ˈpyü-tər", "sound": {"audio": "comput06"}}]
    },
    "fl": "noun",
    "def": [
      {"sseq": [[["sense", {"dt": [["text", "{bc}an automatic electronic machine that can store and process data"]]}]]]}
    ]
  },
  {
    "meta": {"id": "personal computer"},
    "hwi": {"hw": "personal computer"},
    "fl": "noun",
    "def": [
      {"sseq": [[["sense", {"dt": [["text", "{bc}a computer designed for an individual user"]]}]]]}
    ]
  }
]"#;
