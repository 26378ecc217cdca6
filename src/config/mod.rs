use crate::watchlist::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://www.omdbapi.com/";
pub const DEFAULT_TITLE: &str = "usePopcorn";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    pub omdb: Option<OmdbConfig>,
    pub storage: Option<StorageConfig>,
    pub search: Option<SearchConfig>,
    pub watchlist: Option<WatchlistConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OmdbConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(rename = "apikey")]
    pub api_key: Option<String>,
    #[serde(rename = "timeoutSeconds")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(rename = "minQueryLength")]
    pub min_query_length: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchlistConfig {
    #[serde(rename = "maxRating")]
    pub max_rating: Option<u8>,
    pub duplicates: Option<DuplicatePolicy>,
    /// One label per star; ignored unless there are exactly `maxRating` of them.
    #[serde(rename = "ratingLabels")]
    pub rating_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(rename = "defaultTitle")]
    pub default_title: Option<String>,
}

impl Configuration {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads the file when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            warn!("Configuration file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Configuration = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        self.omdb
            .as_ref()
            .and_then(|o| o.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.omdb.as_ref().and_then(|o| o.api_key.as_deref())
    }

    pub fn set_api_key(&mut self, key: String) {
        self.omdb.get_or_insert_with(OmdbConfig::default).api_key = Some(key);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.omdb
                .as_ref()
                .and_then(|o| o.timeout_seconds)
                .unwrap_or(30),
        )
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| PathBuf::from("watched.json"))
    }

    pub fn storage_key(&self) -> &str {
        self.storage
            .as_ref()
            .and_then(|s| s.key.as_deref())
            .unwrap_or("watched")
    }

    pub fn min_query_length(&self) -> usize {
        self.search
            .as_ref()
            .and_then(|s| s.min_query_length)
            .unwrap_or(3)
    }

    pub fn max_rating(&self) -> u8 {
        self.watchlist
            .as_ref()
            .and_then(|w| w.max_rating)
            .filter(|m| *m > 0)
            .unwrap_or(10)
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.watchlist
            .as_ref()
            .and_then(|w| w.duplicates)
            .unwrap_or_default()
    }

    pub fn rating_labels(&self) -> Vec<String> {
        self.watchlist
            .as_ref()
            .and_then(|w| w.rating_labels.clone())
            .unwrap_or_default()
    }

    pub fn default_title(&self) -> &str {
        self.display
            .as_ref()
            .and_then(|d| d.default_title.as_deref())
            .unwrap_or(DEFAULT_TITLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Configuration::from_yaml("{}").unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.api_key(), None);
        assert_eq!(config.storage_key(), "watched");
        assert_eq!(config.min_query_length(), 3);
        assert_eq!(config.max_rating(), 10);
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::Reject);
        assert_eq!(config.default_title(), "usePopcorn");
        assert!(config.rating_labels().is_empty());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn reads_camel_case_keys() {
        let yaml = r#"
omdb:
  baseUrl: http://localhost:8080/
  apikey: abc123
  timeoutSeconds: 5
storage:
  path: /tmp/list.json
  key: seen
search:
  minQueryLength: 2
watchlist:
  maxRating: 5
  duplicates: replace
  ratingLabels: [Awful, Bad, Okay, Good, Great]
display:
  defaultTitle: Popcorn
"#;
        let config = Configuration::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url(), "http://localhost:8080/");
        assert_eq!(config.api_key(), Some("abc123"));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/list.json"));
        assert_eq!(config.storage_key(), "seen");
        assert_eq!(config.min_query_length(), 2);
        assert_eq!(config.max_rating(), 5);
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::Replace);
        assert_eq!(config.rating_labels().len(), 5);
        assert_eq!(config.rating_labels()[4], "Great");
        assert_eq!(config.default_title(), "Popcorn");
    }

    #[test]
    fn api_key_override_creates_section() {
        let mut config = Configuration::default();
        config.set_api_key("xyz".to_string());
        assert_eq!(config.api_key(), Some("xyz"));
    }
}
