//! Workflow step-execution engine.
//!
//! - [`lookup`]: workflow id to name and ordered steps
//! - [`steps`] / [`handlers`]: the step handler registry and built-in steps
//! - [`executor`]: runs the steps in order, one result per step
//! - [`record`]: step results and the execution record
//!
//! [`WorkflowEngine::trigger`] ties them together for one run.

pub mod context;
pub mod executor;
pub mod handlers;
pub mod lookup;
pub mod prompts;
pub mod record;
pub mod steps;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::{AppError, AppResult};

pub use context::{DocumentMutation, RunContext, RunMetadata, StepContext};
pub use executor::WorkflowExecutor;
pub use handlers::create_default_registry;
pub use lookup::{ResolvedWorkflow, WorkflowLookup, WorkflowSource, STORE_BACKED};
pub use record::{ExecutionRecordWriter, StepOutcome, StepResult, WorkflowExecutionRecord};
pub use steps::{StepError, StepHandler, StepOutput, StepRegistry};

/// What a completed run returns to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub workflow: ResolvedWorkflow,
    pub results: Vec<StepResult>,
    pub mutations: Vec<DocumentMutation>,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }
}

#[derive(Clone)]
pub struct WorkflowEngine {
    lookup: WorkflowLookup,
    executor: Arc<WorkflowExecutor>,
    records: ExecutionRecordWriter,
}

impl WorkflowEngine {
    pub fn new(
        lookup: WorkflowLookup,
        executor: Arc<WorkflowExecutor>,
        records: ExecutionRecordWriter,
    ) -> Self {
        Self {
            lookup,
            executor,
            records,
        }
    }

    /// Registered step names.
    pub fn step_names(&self) -> Vec<String> {
        self.executor
            .registry()
            .list()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Resolve the workflow, run every step and write the execution record.
    ///
    /// Only an unknown workflow (`NotFound`) or a failure outside the steps
    /// (`Internal`) is returned as an error; step failures are data in
    /// [`RunReport::results`].
    pub async fn trigger(&self, mut run: RunContext) -> AppResult<RunReport> {
        let workflow = self
            .lookup
            .resolve(&run.workflow_id)
            .await
            .map_err(unhandled)?
            .ok_or_else(|| AppError::NotFound("Workflow not found".to_string()))?;

        info!(
            workflow_id = %workflow.workflow_id,
            document_id = %run.document_id,
            event = %run.trigger_event,
            steps = workflow.steps.len(),
            "Running workflow"
        );

        let results = self.executor.run(&workflow.steps, &mut run).await;
        let completed_at = Utc::now();

        let record =
            WorkflowExecutionRecord::from_results(&run, &workflow.name, results, completed_at);
        let user_email = run.caller.as_ref().map(|c| c.email.clone());
        if let Err(e) = self.records.write(&record, user_email).await {
            error!(workflow_id = %workflow.workflow_id, error = %e, "Failed to write execution record");
            return Err(unhandled(e));
        }

        Ok(RunReport {
            workflow,
            results: record.results,
            mutations: run.mutations().to_vec(),
            completed_at,
        })
    }
}

/// Platform failures outside a step surface as 500, not 502.
fn unhandled(e: AppError) -> AppError {
    match e {
        AppError::Platform(p) => AppError::Internal(p.to_string()),
        other => other,
    }
}
