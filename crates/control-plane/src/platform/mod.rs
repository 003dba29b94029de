//! Backend platform collaborators.
//!
//! Document storage, the audit log collection, authentication, LLM calls,
//! named serverless functions and email are owned by the hosting platform.
//! The engine only sees them through the traits below:
//!
//! - [`EntityStore`]: create/get/update/filter/list over named collections
//! - [`Integrations`]: named functions, LLM invocation, email
//! - [`Authenticator`]: bearer token to caller resolution
//!
//! [`PlatformClient`] talks to the platform over HTTP; [`MemoryPlatform`]
//! keeps everything in process for tests and local development.

mod client;
mod memory;
mod types;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use client::PlatformClient;
pub use memory::MemoryPlatform;
pub use types::{collections, Caller, Document, EmailMessage, LlmRequest};

/// Errors raised by platform collaborators.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Platform answered with a non-success status.
    #[error("Platform returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Entity does not exist.
    #[error("Entity not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Response body could not be decoded.
    #[error("Invalid platform response: {0}")]
    Decode(String),

    /// A named function reported a failure.
    #[error("Function '{name}' failed: {message}")]
    Function { name: String, message: String },

    /// Capability is not reachable or not configured.
    #[error("Platform unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PlatformError::Decode(e.to_string())
        } else {
            PlatformError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(e: serde_json::Error) -> Self {
        PlatformError::Decode(e.to_string())
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Generic entity storage over named collections.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Create a record; returns it with platform-assigned fields (`id`, `created_date`).
    async fn create(&self, collection: &str, data: Value) -> PlatformResult<Value>;

    /// Fetch a record by id.
    async fn get(&self, collection: &str, id: &str) -> PlatformResult<Option<Value>>;

    /// Merge `patch` into an existing record.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> PlatformResult<Value>;

    /// Records whose top-level fields equal every field of `query`, in storage order.
    async fn filter(&self, collection: &str, query: Value) -> PlatformResult<Vec<Value>>;

    /// All records of a collection, in storage order.
    async fn list(&self, collection: &str) -> PlatformResult<Vec<Value>>;

    /// Whether the store answers at all.
    async fn ping(&self) -> bool {
        true
    }
}

/// Platform capabilities invoked by workflow steps.
#[async_trait]
pub trait Integrations: Send + Sync {
    /// Invoke a named serverless function; returns its `data` payload.
    async fn invoke_function(&self, name: &str, payload: Value) -> PlatformResult<Value>;

    /// Invoke the LLM; the result is JSON shaped by `response_json_schema`.
    async fn invoke_llm(&self, request: LlmRequest) -> PlatformResult<Value>;

    async fn send_email(&self, message: EmailMessage) -> PlatformResult<()>;
}

/// Resolves bearer tokens to platform users.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Ok(None)` when the token is unknown or expired.
    async fn authenticate(&self, token: &str) -> PlatformResult<Option<Caller>>;
}
