//! Application configuration for the OmniPDF Control Plane server.

use serde::Deserialize;

/// Backend used for workflow definitions.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL via sqlx.
    #[default]
    Postgres,
    /// Process-local store, lost on restart.
    Memory,
}

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `OMNIPDF_`:
/// - `OMNIPDF_HOST`: Server bind address (default: "0.0.0.0")
/// - `OMNIPDF_PORT`: Server port (default: 8084)
/// - `OMNIPDF_SERVER_NAME`: Name reported by `/api/health`
/// - `OMNIPDF_STORE`: Workflow definition store, `postgres` or `memory`
/// - `OMNIPDF_LEGACY_WORKFLOW_LOOKUP`: Resolve workflows from `workflow_created`
///   audit entries when the keyed store has no match (default: true)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name reported by `/api/health`
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Workflow definition store
    #[serde(default)]
    pub store: StoreBackend,

    /// Fall back to scanning the audit log for workflow definitions
    #[serde(default = "default_true")]
    pub legacy_workflow_lookup: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8084
}

fn default_server_name() -> String {
    "omnipdf-control-plane".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `OMNIPDF_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("OMNIPDF_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            server_name: default_server_name(),
            store: StoreBackend::default(),
            legacy_workflow_lookup: true,
        }
    }
}
