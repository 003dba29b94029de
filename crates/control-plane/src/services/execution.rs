//! Execution history read from `workflow_executed` audit entries.
//!
//! Records written by older releases may lack `document_id` or
//! `executed_at`, so entries are read field by field rather than decoded
//! as a whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppResult;
use crate::store::{actions, ActivityEntry, ActivityLog};

/// One past run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub workflow_id: Option<String>,
    pub workflow_name: Option<String>,
    pub document_id: Option<String>,
    pub trigger_event: Option<String>,
    pub steps_executed: u64,
    pub success_count: u64,
    pub results: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub executed_at: Option<String>,
}

impl From<ActivityEntry> for ExecutionSummary {
    fn from(entry: ActivityEntry) -> Self {
        let details = &entry.details;
        let text = |key: &str| details.get(key).and_then(Value::as_str).map(str::to_string);
        let count = |key: &str| details.get(key).and_then(Value::as_u64).unwrap_or(0);

        Self {
            workflow_id: text("workflow_id"),
            workflow_name: text("workflow_name"),
            document_id: text("document_id").or_else(|| entry.document_id.clone()),
            trigger_event: text("trigger_event"),
            steps_executed: count("steps_executed"),
            success_count: count("success_count"),
            results: details
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            executed_at: text("executed_at").or_else(|| entry.created_date.clone()),
            user_email: entry.user_email,
            id: entry.id,
        }
    }
}

#[derive(Clone)]
pub struct ExecutionService {
    activity: ActivityLog,
}

impl ExecutionService {
    pub fn new(activity: ActivityLog) -> Self {
        Self { activity }
    }

    /// Past runs in log order, optionally for one workflow.
    pub async fn list(&self, workflow_id: Option<&str>) -> AppResult<Vec<ExecutionSummary>> {
        Ok(self
            .activity
            .find(actions::WORKFLOW_EXECUTED)
            .await?
            .into_iter()
            .map(ExecutionSummary::from)
            .filter(|s| workflow_id.is_none() || s.workflow_id.as_deref() == workflow_id)
            .collect())
    }
}
