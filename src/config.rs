//! Configuration and settings management
//!
//! Loads settings from environment variables and optional config files.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Path to the yt-dlp executable
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: String,

    /// Maximum number of tracks returned per search
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Language tag used when a chat has not picked one ("en", "ru", "kaz")
    #[serde(default = "default_lang")]
    pub default_lang: String,

    /// Budget for a single yt-dlp invocation, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Idle time after which a chat's session is evicted, in seconds
    #[serde(default = "default_session_idle_ttl_secs")]
    pub session_idle_ttl_secs: u64,

    /// Maximum number of concurrently retained chat sessions
    #[serde(default = "default_session_max_capacity")]
    pub session_max_capacity: u64,

    /// Optional banner image sent above the result keyboard
    pub banner_path: Option<String>,

    /// Optional thumbnail attached to delivered audio
    pub thumbnail_path: Option<String>,
}

fn default_yt_dlp_path() -> String {
    "yt-dlp".to_string()
}

const fn default_search_limit() -> u32 {
    10
}

fn default_lang() -> String {
    "ru".to_string()
}

const fn default_provider_timeout_secs() -> u64 {
    180
}

const fn default_session_idle_ttl_secs() -> u64 {
    3600
}

const fn default_session_max_capacity() -> u64 {
    10_000
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is
    /// missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;

        if settings.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN must not be empty".to_string(),
            ));
        }
        if settings.search_limit == 0 {
            return Err(ConfigError::Message(
                "SEARCH_LIMIT must be at least 1".to_string(),
            ));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env() {
        for key in [
            "TELEGRAM_TOKEN",
            "YT_DLP_PATH",
            "SEARCH_LIMIT",
            "DEFAULT_LANG",
        ] {
            env::remove_var(key);
        }
    }

    // Touches process-wide env vars, so everything shares one #[test] to
    // avoid races under the parallel test runner.
    #[test]
    fn test_env_loading_and_defaults() -> Result<(), Box<dyn std::error::Error>> {
        clear_env();

        // Missing token is fatal
        assert!(Settings::new().is_err());

        // Token alone is enough; everything else defaults
        env::set_var("TELEGRAM_TOKEN", "dummy_token");
        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.yt_dlp_path, "yt-dlp");
        assert_eq!(settings.search_limit, 10);
        assert_eq!(settings.default_lang, "ru");
        assert_eq!(settings.banner_path, None);

        // Explicit overrides are picked up
        env::set_var("YT_DLP_PATH", "/usr/local/bin/yt-dlp");
        env::set_var("SEARCH_LIMIT", "5");
        env::set_var("DEFAULT_LANG", "en");
        let settings = Settings::new()?;
        assert_eq!(settings.yt_dlp_path, "/usr/local/bin/yt-dlp");
        assert_eq!(settings.search_limit, 5);
        assert_eq!(settings.default_lang, "en");

        // Zero result limit is rejected
        env::set_var("SEARCH_LIMIT", "0");
        assert!(Settings::new().is_err());

        clear_env();
        Ok(())
    }
}
