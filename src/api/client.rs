//! HTTP client for the dictionary service.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ApiConfig;

use super::models::DictionaryEntry;
use super::{ApiError, DictionaryApi};

/// Client for `GET <base>/api/v3/references/<dict>/json/<word>?key=<key>`.
pub struct DictionaryClient {
    client: Client,
    base_url: String,
    dictionary: String,
    api_key: String,
}

impl DictionaryClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dictionary: config.dictionary.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl DictionaryApi for DictionaryClient {
    async fn get_word(&self, word: &str) -> Result<Vec<DictionaryEntry>, ApiError> {
        let url = format!(
            "{}/api/v3/references/{}/json/{}",
            self.base_url, self.dictionary, word
        );
        debug!(word, "Looking up word");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        // A lookup miss returns an array of suggestion strings rather than
        // entry objects; elements that don't parse as entries are dropped.
        let value: serde_json::Value = response.json().await?;
        let entries = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }
}
