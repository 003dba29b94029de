//! Step handler trait and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::context::StepContext;
use crate::platform::PlatformError;

/// Why a single step failed. Recorded in the step's result entry; never
/// aborts the run.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Unknown workflow step: {0}")]
    UnknownStep(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("No notification recipient")]
    NoRecipient,

    /// A capability answered with something the step cannot use.
    #[error("Invalid response from {capability}: {message}")]
    InvalidResponse { capability: String, message: String },

    #[error("Step '{0}' returned a document change but does not declare document writes")]
    UndeclaredMutation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl From<minijinja::Error> for StepError {
    fn from(e: minijinja::Error) -> Self {
        StepError::Template(e.to_string())
    }
}

/// A step's payload plus, for mutating steps, the patch to apply to the
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub result: Value,
    pub document_patch: Option<Value>,
}

impl StepOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            document_patch: None,
        }
    }

    pub fn with_document_patch(mut self, patch: Value) -> Self {
        self.document_patch = Some(patch);
        self
    }
}

/// One named workflow step.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Step name as it appears in workflow definitions.
    fn name(&self) -> &'static str;

    /// Whether the step may write to the document.
    fn mutates_document(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError>;
}

/// Step handlers by name.
pub struct StepRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any handler with the same name.
    pub fn register<H: StepHandler + 'static>(&mut self, handler: H) {
        self.handlers
            .insert(handler.name().to_string(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Handler for `name`, or [`StepError::UnknownStep`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn StepHandler>, StepError> {
        self.get(name)
            .ok_or_else(|| StepError::UnknownStep(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered step names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.list())
            .finish()
    }
}
