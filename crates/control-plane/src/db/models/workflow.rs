//! Workflow definition model.
//!
//! A workflow is a named, ordered list of step names. Definitions are keyed
//! by `workflow_id`, which is unique across the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WorkflowDefinition {
    /// Unique workflow id
    pub workflow_id: String,

    /// Display name, reported back on every run
    pub name: String,

    /// Step names in execution order
    pub steps: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Email of the creating user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Ids that collide with static routes under `/api/workflows/`.
pub const RESERVED_WORKFLOW_IDS: &[&str] = &["steps", "trigger"];

/// Request to create a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    /// Caller-chosen id; a UUID is generated when absent.
    #[serde(default, alias = "workflowId", skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub steps: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewWorkflow {
    /// Validate the request.
    ///
    /// Step names are not checked against the registry: an unknown step is
    /// reported per run, not at definition time.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Workflow name must not be empty".to_string());
        }
        if let Some(id) = &self.workflow_id {
            if id.trim().is_empty() {
                return Err("Workflow id must not be blank".to_string());
            }
            if RESERVED_WORKFLOW_IDS.contains(&id.as_str()) {
                return Err(format!("Workflow id '{}' is reserved", id));
            }
            if id.contains(&['/', '?', '#'][..]) {
                return Err("Workflow id must not contain '/', '?' or '#'".to_string());
            }
        }
        if let Some(pos) = self.steps.iter().position(|s| s.trim().is_empty()) {
            return Err(format!("Step {} has an empty name", pos + 1));
        }
        Ok(())
    }

    /// Build the stored definition.
    pub fn into_definition(self, created_by: Option<String>) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: self
                .workflow_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name.trim().to_string(),
            steps: self.steps,
            description: self.description,
            created_by,
            created_at: Utc::now(),
        }
    }
}
