//! Execution history API handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::execution::{ExecutionService, ExecutionSummary};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListExecutionsQuery {
    pub workflow_id: Option<String>,
}

/// List past runs.
///
/// GET /api/executions?workflow_id=
pub async fn list(
    State(service): State<ExecutionService>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<Vec<ExecutionSummary>>, AppError> {
    let runs = service.list(query.workflow_id.as_deref()).await?;
    Ok(Json(runs))
}
