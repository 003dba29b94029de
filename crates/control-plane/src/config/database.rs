//! PostgreSQL settings for the workflow definition store.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// `POSTGRES_*` settings, read only when `OMNIPDF_STORE=postgres`.
///
/// - `POSTGRES_URL`: full connection URL; when set it replaces the
///   host/port/user/password/database variables
/// - `POSTGRES_HOST`, `POSTGRES_PORT`, `POSTGRES_USER`, `POSTGRES_PASSWORD`,
///   `POSTGRES_DATABASE`
/// - `POSTGRES_POOL_SIZE`: upper bound on pooled connections (default: 5)
/// - `POSTGRES_ACQUIRE_TIMEOUT_SECS`: wait for a free connection (default: 10)
///
/// The store sees definition CRUD and one keyed read per trigger, so the
/// pool stays small.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "omnipdf".to_string(),
            password: String::new(),
            database: "omnipdf".to_string(),
            pool_size: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("POSTGRES_").from_env::<DatabaseConfig>()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Connection options; a malformed `POSTGRES_URL` is an error.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match self.url() {
            Some(url) => PgConnectOptions::from_str(url),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.database)),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Server and database for log lines. Credentials are never included.
    pub fn target(&self) -> String {
        match self.url() {
            Some(url) => {
                let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
                let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
                rest.split('?').next().unwrap_or(rest).to_string()
            }
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}
