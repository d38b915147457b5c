//! Application configuration loaded from environment variables.

use chrono_tz::Tz;
use std::env;
use std::str::FromStr;

/// Timezone used when no `STREAK_TIMEZONE` is set.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Bogota;

/// Which backend holds streak records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Firestore,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(ConfigError::Invalid {
                key: "STREAK_STORE",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reference timezone for Saturday normalization
    pub timezone: Tz,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// Storage backend for streak records
    pub store: StoreBackend,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            gcp_project_id: "test-project".to_string(),
            store: StoreBackend::Memory,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let timezone = match env::var("STREAK_TIMEZONE") {
            Ok(name) => name.trim().parse::<Tz>().map_err(|_| ConfigError::Invalid {
                key: "STREAK_TIMEZONE",
                value: name,
            })?,
            Err(_) => DEFAULT_TIMEZONE,
        };

        let store = match env::var("STREAK_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        let gcp_project_id = match (store, env::var("GCP_PROJECT_ID")) {
            (_, Ok(project)) => project,
            (StoreBackend::Firestore, Err(_)) => {
                return Err(ConfigError::Missing("GCP_PROJECT_ID"));
            }
            (StoreBackend::Memory, Err(_)) => "local-dev".to_string(),
        };

        Ok(Self {
            timezone,
            gcp_project_id,
            store,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
