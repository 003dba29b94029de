//! Configuration for the backend platform the engine delegates to.

use std::time::Duration;

use serde::Deserialize;

/// Platform configuration loaded from environment variables.
///
/// Environment variables are prefixed with `PLATFORM_`:
/// - `PLATFORM_BASE_URL`: Platform API root (default: "http://localhost:8090")
/// - `PLATFORM_APP_ID`: Application id on the platform (default: "omnipdf")
/// - `PLATFORM_API_KEY`: Service key sent with entity/integration calls
/// - `PLATFORM_TIMEOUT_SECS`: Per-request timeout (default: 120)
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_app_id")]
    pub app_id: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_app_id() -> String {
    "omnipdf".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl PlatformConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("PLATFORM_").from_env::<PlatformConfig>()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_id: default_app_id(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
