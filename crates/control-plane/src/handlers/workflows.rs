//! Workflow definition and trigger API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::models::{NewWorkflow, WorkflowDefinition};
use crate::engine::{RunContext, RunMetadata, StepResult};
use crate::error::AppError;
use crate::platform::Caller;
use crate::services::WorkflowService;

/// Body of `POST /api/workflows/trigger`.
///
/// `event` and `metadata` may be absent or `null`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub workflow_id: String,
    pub document_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: RunMetadata,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Returned once every step has run, whether or not the steps succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub workflow: String,
    pub results: Vec<StepResult>,
    /// Completion time, RFC 3339 in UTC with milliseconds
    pub execution_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepNamesResponse {
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub workflow_id: String,
    pub deleted: bool,
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Run a workflow against a document.
///
/// POST /api/workflows/trigger
pub async fn trigger(
    State(service): State<WorkflowService>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<Json<TriggerResponse>, AppError> {
    let Json(request) = payload.map_err(bad_json)?;

    let run = RunContext::new(
        request.workflow_id,
        request.document_id,
        request.event,
        request.metadata,
    )
    .with_caller(caller);

    let report = service.trigger(run).await?;

    Ok(Json(TriggerResponse {
        success: true,
        workflow: report.workflow.name,
        results: report.results,
        execution_time: report
            .completed_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Create a workflow definition.
///
/// POST /api/workflows
pub async fn create(
    State(service): State<WorkflowService>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<NewWorkflow>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkflowDefinition>), AppError> {
    let Json(request) = payload.map_err(bad_json)?;
    let definition = service.create(request, &caller).await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

/// GET /api/workflows
pub async fn list(
    State(service): State<WorkflowService>,
) -> Result<Json<Vec<WorkflowDefinition>>, AppError> {
    Ok(Json(service.list().await?))
}

/// GET /api/workflows/{workflow_id}
pub async fn get(
    State(service): State<WorkflowService>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowDefinition>, AppError> {
    Ok(Json(service.get(&workflow_id).await?))
}

/// DELETE /api/workflows/{workflow_id}
pub async fn delete(
    State(service): State<WorkflowService>,
    Extension(caller): Extension<Caller>,
    Path(workflow_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    service.delete(&workflow_id, &caller).await?;
    Ok(Json(DeleteResponse {
        workflow_id,
        deleted: true,
    }))
}

/// Step names a definition may use.
///
/// GET /api/workflows/steps
pub async fn steps(State(service): State<WorkflowService>) -> Json<StepNamesResponse> {
    Json(StepNamesResponse {
        steps: service.step_names(),
    })
}
