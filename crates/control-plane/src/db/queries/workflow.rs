//! Workflow definition queries.

use crate::db::models::WorkflowDefinition;
use crate::db::DbPool;
use crate::error::AppResult;

/// Insert a definition.
///
/// Returns `None` when the workflow id is already taken.
pub async fn insert_workflow(
    pool: &DbPool,
    definition: &WorkflowDefinition,
) -> AppResult<Option<WorkflowDefinition>> {
    let row = sqlx::query_as::<_, WorkflowDefinition>(
        r#"
        INSERT INTO omnipdf.workflow_definition (
            workflow_id, name, steps, description, created_by, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (workflow_id) DO NOTHING
        RETURNING workflow_id, name, steps, description, created_by, created_at
        "#,
    )
    .bind(&definition.workflow_id)
    .bind(&definition.name)
    .bind(&definition.steps)
    .bind(&definition.description)
    .bind(&definition.created_by)
    .bind(definition.created_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Get a definition by id.
pub async fn get_workflow(
    pool: &DbPool,
    workflow_id: &str,
) -> AppResult<Option<WorkflowDefinition>> {
    let row = sqlx::query_as::<_, WorkflowDefinition>(
        r#"
        SELECT workflow_id, name, steps, description, created_by, created_at
        FROM omnipdf.workflow_definition
        WHERE workflow_id = $1
        "#,
    )
    .bind(workflow_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List definitions, oldest first.
pub async fn list_workflows(pool: &DbPool) -> AppResult<Vec<WorkflowDefinition>> {
    let rows = sqlx::query_as::<_, WorkflowDefinition>(
        r#"
        SELECT workflow_id, name, steps, description, created_by, created_at
        FROM omnipdf.workflow_definition
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a definition. Returns whether a row was removed.
pub async fn delete_workflow(pool: &DbPool, workflow_id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM omnipdf.workflow_definition WHERE workflow_id = $1")
        .bind(workflow_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
