//! PostgreSQL-backed workflow store.

use async_trait::async_trait;

use super::{duplicate_workflow, WorkflowStore};
use crate::db::models::WorkflowDefinition;
use crate::db::pool::health_check;
use crate::db::queries::workflow as queries;
use crate::db::DbPool;
use crate::error::AppResult;

/// Workflow definitions in `omnipdf.workflow_definition`.
#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: DbPool,
}

impl PgWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn insert(&self, definition: WorkflowDefinition) -> AppResult<WorkflowDefinition> {
        queries::insert_workflow(&self.pool, &definition)
            .await?
            .ok_or_else(|| duplicate_workflow(&definition.workflow_id))
    }

    async fn get(&self, workflow_id: &str) -> AppResult<Option<WorkflowDefinition>> {
        queries::get_workflow(&self.pool, workflow_id).await
    }

    async fn list(&self) -> AppResult<Vec<WorkflowDefinition>> {
        queries::list_workflows(&self.pool).await
    }

    async fn delete(&self, workflow_id: &str) -> AppResult<bool> {
        queries::delete_workflow(&self.pool, workflow_id).await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> bool {
        health_check(&self.pool).await
    }
}
