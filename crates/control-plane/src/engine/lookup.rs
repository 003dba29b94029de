//! Resolve a workflow id to its name and ordered steps.
//!
//! The keyed [`WorkflowStore`] is authoritative. Definitions created before
//! it existed live only as `workflow_created` audit entries; when enabled,
//! those are scanned in log order and the first entry whose
//! `details.workflow_id` matches wins.
//!
//! Entries the service writes for keyed definitions carry
//! [`STORE_BACKED`]; the scan skips them, so a deleted definition stays
//! deleted.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::db::models::WorkflowDefinition;
use crate::error::AppResult;
use crate::store::{actions, ActivityEntry, ActivityLog, WorkflowStore};

/// Marks a `workflow_created` entry whose definition lives in the keyed store.
pub const STORE_BACKED: &str = "store_backed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowSource {
    Store,
    Legacy,
}

/// A workflow ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWorkflow {
    pub workflow_id: String,
    pub name: String,
    pub steps: Vec<String>,
    pub source: WorkflowSource,
}

impl From<WorkflowDefinition> for ResolvedWorkflow {
    fn from(def: WorkflowDefinition) -> Self {
        Self {
            workflow_id: def.workflow_id,
            name: def.name,
            steps: def.steps,
            source: WorkflowSource::Store,
        }
    }
}

impl ResolvedWorkflow {
    /// Build from a legacy `workflow_created` entry.
    ///
    /// A missing name falls back to the id. Step entries that are not
    /// strings use their `name` field when present, otherwise their JSON
    /// text, so they fail as unknown steps instead of disappearing.
    fn from_legacy(workflow_id: &str, entry: &ActivityEntry) -> Self {
        let name = entry
            .details
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(workflow_id)
            .to_string();

        let steps = entry
            .details
            .get("steps")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(legacy_step_name).collect())
            .unwrap_or_default();

        Self {
            workflow_id: workflow_id.to_string(),
            name,
            steps,
            source: WorkflowSource::Legacy,
        }
    }
}

fn is_legacy_entry_for(entry: &ActivityEntry, workflow_id: &str) -> bool {
    let store_backed = entry
        .details
        .get(STORE_BACKED)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    !store_backed && entry.details.get("workflow_id").and_then(Value::as_str) == Some(workflow_id)
}

fn legacy_step_name(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

#[derive(Clone)]
pub struct WorkflowLookup {
    store: Arc<dyn WorkflowStore>,
    activity: ActivityLog,
    legacy_enabled: bool,
}

impl WorkflowLookup {
    pub fn new(store: Arc<dyn WorkflowStore>, activity: ActivityLog, legacy_enabled: bool) -> Self {
        Self {
            store,
            activity,
            legacy_enabled,
        }
    }

    pub async fn resolve(&self, workflow_id: &str) -> AppResult<Option<ResolvedWorkflow>> {
        if let Some(def) = self.store.get(workflow_id).await? {
            return Ok(Some(def.into()));
        }

        if !self.legacy_enabled {
            return Ok(None);
        }

        let found = self
            .activity
            .find(actions::WORKFLOW_CREATED)
            .await?
            .iter()
            .find(|entry| is_legacy_entry_for(entry, workflow_id))
            .map(|entry| ResolvedWorkflow::from_legacy(workflow_id, entry));

        if found.is_some() {
            debug!(workflow_id, "Resolved workflow from legacy audit entry");
        }
        Ok(found)
    }
}
