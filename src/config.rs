//! Application configuration loaded from environment variables.
//!
//! Secrets (identity and mail API keys) are injected via the environment;
//! nothing sensitive lives in source.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,

    /// Identity service REST endpoint
    pub identity_api_url: String,
    /// Identity service API key
    pub identity_api_key: String,

    /// Mail delivery REST endpoint
    pub mail_api_url: String,
    /// Mail delivery API key
    pub mail_api_key: String,
    /// Sender address for notifications
    pub mail_from: String,

    /// Seconds between accrual job ticks
    pub accrual_interval_secs: u64,
    /// Length of a mining session in seconds
    pub session_duration_secs: u64,
    /// Read cache TTL in seconds
    pub cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            identity_api_url: env::var("IDENTITY_API_URL")
                .map_err(|_| ConfigError::Missing("IDENTITY_API_URL"))?,
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,

            mail_api_url: env::var("MAIL_API_URL")
                .map_err(|_| ConfigError::Missing("MAIL_API_URL"))?,
            mail_api_key: env::var("MAIL_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MAIL_API_KEY"))?,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@nxo-mining.app".to_string()),

            accrual_interval_secs: parse_secs("ACCRUAL_INTERVAL_SECS", 5),
            session_duration_secs: parse_secs("SESSION_DURATION_SECS", 3600),
            cache_ttl_secs: parse_secs("CACHE_TTL_SECS", 60),
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            identity_api_url: "http://localhost:9099".to_string(),
            identity_api_key: "test_identity_key".to_string(),
            mail_api_url: "http://localhost:9100".to_string(),
            mail_api_key: "test_mail_key".to_string(),
            mail_from: "test@nxo-mining.app".to_string(),
            accrual_interval_secs: 5,
            session_duration_secs: 3600,
            cache_ttl_secs: 60,
        }
    }
}

fn parse_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
