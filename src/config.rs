use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Default configuration values
const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";
const DEFAULT_MIRROR_FILE: &str = "factoria-session.json";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Configuration for the session core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Base URL of the identity service (sign-in, sign-up).
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    /// Base URL of the token endpoint used for refresh grants.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// API key passed to the identity service.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Base URL of the portal backend.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Seconds between background token refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Where the persisted session mirror lives.
    #[serde(default = "default_mirror_path")]
    pub mirror_path: PathBuf,
}

// Default functions
fn default_identity_url() -> String {
    std::env::var("FACTORIA_IDENTITY_URL").unwrap_or_else(|_| DEFAULT_IDENTITY_URL.to_string())
}

fn default_token_url() -> String {
    std::env::var("FACTORIA_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string())
}

fn default_api_key() -> String {
    std::env::var("FACTORIA_API_KEY").unwrap_or_default()
}

fn default_api_base() -> String {
    std::env::var("FACTORIA_API_BASE").unwrap_or_default()
}

fn default_refresh_interval() -> u64 {
    std::env::var("FACTORIA_REFRESH_INTERVAL_SECS")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS)
}

fn default_mirror_path() -> PathBuf {
    std::env::var("FACTORIA_MIRROR_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MIRROR_FILE))
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            identity_url: default_identity_url(),
            token_url: default_token_url(),
            api_key: default_api_key(),
            api_base: default_api_base(),
            refresh_interval_secs: default_refresh_interval(),
            mirror_path: default_mirror_path(),
        }
    }
}

impl CoreConfig {
    /// Build a configuration from the environment, loading a `.env`
    /// file first when one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::default()
    }
}
