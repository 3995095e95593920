use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level library configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordWellConfig {
    pub api: ApiConfig,
    pub data: DataConfig,
}

/// Remote dictionary service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key appended to every lookup request.
    pub api_key: String,
    /// Dictionary short-name in the request path (e.g. "sd2").
    pub dictionary: String,
    /// Base URL of the dictionary service.
    pub base_url: String,
    /// Base URL for pronunciation audio files.
    pub audio_base_url: String,
    /// Use the canned mock service instead of the real one.
    pub use_mock: bool,
    /// Optional remote endpoint the mock service pulls canned data from.
    pub mock_url: Option<String>,
    /// Connect/read timeout in seconds for remote calls.
    pub timeout_secs: u64,
}

/// Data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for WordWellConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            dictionary: "sd2".to_string(),
            base_url: "https://dictionaryapi.com".to_string(),
            audio_base_url: "https://media.merriam-webster.com/audio/prons/en/us/mp3".to_string(),
            use_mock: false,
            mock_url: None,
            timeout_secs: 30,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_dir: None }
    }
}

impl WordWellConfig {
    /// Load configuration from `~/.config/wordwell/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config at {}: {e} — using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {} — using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("wordwell"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Directory where downloaded pronunciation files land.
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir().join("audio")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("wordwell").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WordWellConfig::default();
        assert_eq!(config.api.dictionary, "sd2");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.api.use_mock);
        assert!(config.data.data_dir.is_none());
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = WordWellConfig::default();
        config.data.data_dir = Some(PathBuf::from("/tmp/custom"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/custom"));
        assert_eq!(config.audio_dir(), PathBuf::from("/tmp/custom/audio"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = WordWellConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: WordWellConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.api.base_url, config.api.base_url);
        assert_eq!(deserialized.api.audio_base_url, config.api.audio_base_url);
    }
}
