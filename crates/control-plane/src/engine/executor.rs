//! Sequential step execution.
//!
//! Steps run one at a time in definition order. Every step yields a
//! `Result`; failures become error entries and the run always continues to
//! the last step. The document is fetched again before each step so writes
//! made by earlier steps are visible.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::context::RunContext;
use super::prompts::PromptRenderer;
use super::record::StepResult;
use super::steps::{StepError, StepRegistry};
use crate::platform::{collections, Document, EntityStore, Integrations};

pub struct WorkflowExecutor {
    registry: Arc<StepRegistry>,
    entities: Arc<dyn EntityStore>,
    integrations: Arc<dyn Integrations>,
    prompts: PromptRenderer,
}

impl WorkflowExecutor {
    pub fn new(
        registry: Arc<StepRegistry>,
        entities: Arc<dyn EntityStore>,
        integrations: Arc<dyn Integrations>,
    ) -> Self {
        Self {
            registry,
            entities,
            integrations,
            prompts: PromptRenderer::new(),
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Run `steps` in order. Returns one result per step.
    pub async fn run(&self, steps: &[String], run: &mut RunContext) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(steps.len());

        for step in steps {
            let result = match self.run_step(step, run).await {
                Ok(value) => {
                    debug!(workflow_id = %run.workflow_id, step = %step, "Step succeeded");
                    StepResult::success(step.as_str(), value)
                }
                Err(e) => {
                    warn!(workflow_id = %run.workflow_id, step = %step, error = %e, "Step failed");
                    StepResult::error(step.as_str(), e)
                }
            };
            results.push(result);
        }

        info!(
            workflow_id = %run.workflow_id,
            document_id = %run.document_id,
            steps = results.len(),
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            "Workflow run finished"
        );
        results
    }

    async fn run_step(&self, step: &str, run: &mut RunContext) -> Result<Value, StepError> {
        let handler = self.registry.resolve(step)?;
        let document = self.fetch_document(&run.document_id).await?;

        let output = handler
            .run(&run.step(&document, self.integrations.as_ref(), &self.prompts))
            .await?;

        if let Some(patch) = output.document_patch {
            if !handler.mutates_document() {
                return Err(StepError::UndeclaredMutation(step.to_string()));
            }
            // Last write wins; concurrent runs on the same document are not coordinated.
            self.entities
                .update(collections::DOCUMENT, &document.id, patch.clone())
                .await?;
            run.record_mutation(step, patch);
        }

        Ok(output.result)
    }

    async fn fetch_document(&self, document_id: &str) -> Result<Document, StepError> {
        let record = self
            .entities
            .get(collections::DOCUMENT, document_id)
            .await?
            .ok_or_else(|| StepError::DocumentNotFound(document_id.to_string()))?;

        serde_json::from_value(record).map_err(|e| StepError::InvalidResponse {
            capability: collections::DOCUMENT.to_string(),
            message: e.to_string(),
        })
    }
}
