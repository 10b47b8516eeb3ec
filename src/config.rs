//! Configuration file parser for ~/.config/telepulse/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged, since they are usually typos.
//! A few environment variables override the file (see [`Config::apply_env`]).
use crate::api::{ClientOptions, HostIdentity, DEFAULT_BASE_URL, FALLBACK_USER_ID};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_API_URL: &str = "TELEPULSE_API_URL";
pub const ENV_USER_ID: &str = "TELEPULSE_USER_ID";
pub const ENV_INIT_DATA: &str = "TELEGRAM_INIT_DATA";

const KNOWN_KEYS: &[&str] = &[
    "api_base_url",
    "user_id",
    "fallback_user_id",
    "feed_page_size",
    "recommendation_limit",
    "search_debounce_ms",
    "ai_status_poll_secs",
    "request_timeout_secs",
];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level client configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL, endpoints are appended as path segments.
    pub api_base_url: String,

    /// Fixed caller identity. Host init data takes precedence when present.
    pub user_id: Option<i64>,

    /// Identity sent when neither the host nor `user_id` provides one.
    pub fallback_user_id: i64,

    pub feed_page_size: u32,
    pub recommendation_limit: u32,
    pub search_debounce_ms: u64,
    pub ai_status_poll_secs: u64,
    pub request_timeout_secs: u64,

    /// Host init data, only ever read from the environment.
    #[serde(skip)]
    pub host_init_data: Option<SecretString>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            user_id: None,
            fallback_user_id: FALLBACK_USER_ID,
            feed_page_size: crate::store::feed::DEFAULT_PAGE_SIZE,
            recommendation_limit: crate::store::recommendations::DEFAULT_RECOMMENDATION_LIMIT,
            search_debounce_ms: 300,
            ai_status_poll_secs: 2,
            request_timeout_secs: 20,
            host_init_data: None,
        }
    }
}

/// SEC-015: Mask host init data in Debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("user_id", &self.user_id)
            .field("fallback_user_id", &self.fallback_user_id)
            .field("feed_page_size", &self.feed_page_size)
            .field("recommendation_limit", &self.recommendation_limit)
            .field("search_debounce_ms", &self.search_debounce_ms)
            .field("ai_status_poll_secs", &self.ai_status_poll_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "host_init_data",
                &self.host_init_data.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or blank file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), api_base_url = %config.api_base_url, "Loaded configuration");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Blank values are treated as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            tracing::debug!(key = ENV_API_URL, "Overriding API base URL from environment");
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = get(ENV_USER_ID) {
            let id = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidEnv {
                    key: ENV_USER_ID,
                    value: raw.clone(),
                })?;
            self.user_id = Some(id);
        }
        if let Some(init_data) = get(ENV_INIT_DATA) {
            tracing::debug!(key = ENV_INIT_DATA, "Using host init data from environment");
            self.host_init_data = Some(SecretString::from(init_data));
        }
        Ok(())
    }

    /// Check values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason,
        };
        let url = url::Url::parse(&self.api_base_url).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(invalid(format!("unsupported scheme {}", scheme))),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        Ok(())
    }

    /// Identity precedence: host init data, then a fixed `user_id`, else none.
    pub fn host_identity(&self) -> HostIdentity {
        if let Some(init_data) = &self.host_init_data {
            return HostIdentity::InitData(SecretString::from(
                init_data.expose_secret().to_owned(),
            ));
        }
        match self.user_id {
            Some(id) => HostIdentity::Fixed(id),
            None => HostIdentity::Absent,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api_base_url.clone(),
            identity: self.host_identity(),
            fallback_user_id: self.fallback_user_id,
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn ai_status_interval(&self) -> Duration {
        Duration::from_secs(self.ai_status_poll_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("telepulse_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:8080/api");
        assert_eq!(config.fallback_user_id, 12345);
        assert_eq!(config.feed_page_size, 20);
        assert_eq!(config.recommendation_limit, 10);
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.ai_status_interval(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/telepulse_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.feed_page_size, 20);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config(
            "partial",
            "api_base_url = \"https://pulse.example.com/api\"\nfeed_page_size = 50\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_base_url, "https://pulse.example.com/api");
        assert_eq!(config.feed_page_size, 50);
        assert_eq!(config.recommendation_limit, 10);
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "feed_page_size = 5\ntotally_fake_key = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_page_size, 5);
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrongtype", "feed_page_size = \"many\"\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        cleanup(&path);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config
            .apply_env_from(env(&[
                (ENV_API_URL, "https://api.example.com/"),
                (ENV_USER_ID, " 42 "),
            ]))
            .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/");
        assert_eq!(config.host_identity().user_id(), Some(42));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = Config::default();
        config.apply_env_from(env(&[(ENV_API_URL, "  ")])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_bad_user_id_env_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env_from(env(&[(ENV_USER_ID, "abc")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_init_data_wins_over_fixed_id() {
        let mut config = Config::default();
        config
            .apply_env_from(env(&[
                (ENV_USER_ID, "42"),
                (ENV_INIT_DATA, "user=%7B%22id%22%3A777%7D&hash=abc"),
            ]))
            .unwrap();
        assert_eq!(config.host_identity().user_id(), Some(777));
    }

    #[test]
    fn test_validate_rejects_bad_base_urls() {
        let mut config = Config::default();
        config.api_base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        config.api_base_url = "ftp://example.com/api".to_string();
        assert!(config.validate().is_err());
    }

    // SEC-015: Debug output masks init data
    #[test]
    fn test_debug_masks_init_data() {
        let mut config = Config::default();
        config.host_init_data = Some(SecretString::from("user=secret-hash".to_string()));
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("secret-hash"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
