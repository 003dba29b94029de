//! Persistence seams owned by the control plane.
//!
//! - [`WorkflowStore`]: keyed workflow definitions with a unique id
//! - [`ActivityLog`]: the audit trail kept in the platform `ActivityLog`
//!   collection (execution records and definition history)

mod activity;
mod memory;
mod postgres;

use async_trait::async_trait;

use crate::db::models::WorkflowDefinition;
use crate::error::AppResult;

pub use activity::{actions, ActivityEntry, ActivityLog, NewActivity};
pub use memory::MemoryWorkflowStore;
pub use postgres::PgWorkflowStore;

/// Keyed store of workflow definitions.
///
/// Implementations must reject a second definition with an id that is
/// already present (`AppError::Conflict`).
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn insert(&self, definition: WorkflowDefinition) -> AppResult<WorkflowDefinition>;

    async fn get(&self, workflow_id: &str) -> AppResult<Option<WorkflowDefinition>>;

    async fn list(&self) -> AppResult<Vec<WorkflowDefinition>>;

    /// Returns whether a definition was removed.
    async fn delete(&self, workflow_id: &str) -> AppResult<bool>;

    /// Name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> bool;
}

pub(crate) fn duplicate_workflow(workflow_id: &str) -> crate::error::AppError {
    crate::error::AppError::Conflict(format!("Workflow already exists: {}", workflow_id))
}
