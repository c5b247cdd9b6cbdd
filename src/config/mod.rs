//! Configuration module for the portal client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the portal backend API
    pub api_url: String,
    /// Path to the SQLite file backing durable local storage
    pub storage_path: PathBuf,
    /// How often the session-info payload is re-fetched
    pub session_poll_interval: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_url = env::var("ROBOMOTION_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let storage_path = env::var("ROBOMOTION_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/client.sqlite".to_string())
            .into();

        let poll_secs: u64 = env::var("ROBOMOTION_SESSION_POLL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .expect("Invalid ROBOMOTION_SESSION_POLL_SECS format");

        let log_level = env::var("ROBOMOTION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_url,
            storage_path,
            session_poll_interval: Duration::from_secs(poll_secs.max(1)),
            log_level,
        }
    }
}
