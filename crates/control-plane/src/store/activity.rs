//! Audit trail kept in the platform `ActivityLog` collection.
//!
//! SECURITY: entry details are sanitized before storage so that tokens or
//! passwords passed through run metadata never reach the log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::AppResult;
use crate::platform::{collections, EntityStore};
use crate::sanitize::sanitize_sensitive_data;

/// Audit actions written or read by the engine.
pub mod actions {
    /// A workflow definition was created (legacy definitions live only here).
    pub const WORKFLOW_CREATED: &str = "workflow_created";
    /// A workflow ran; details hold the execution record.
    pub const WORKFLOW_EXECUTED: &str = "workflow_executed";
    pub const WORKFLOW_DELETED: &str = "workflow_deleted";
}

/// Stored audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

/// Entry to append.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub action: &'static str,
    pub document_id: Option<String>,
    pub user_email: Option<String>,
    pub details: Value,
}

/// Append-only view of the platform audit log.
#[derive(Clone)]
pub struct ActivityLog {
    entities: Arc<dyn EntityStore>,
}

impl ActivityLog {
    pub fn new(entities: Arc<dyn EntityStore>) -> Self {
        Self { entities }
    }

    /// Append an entry.
    pub async fn record(&self, entry: NewActivity) -> AppResult<ActivityEntry> {
        let mut record = json!({
            "action": entry.action,
            "details": sanitize_sensitive_data(&entry.details),
        });
        if let Some(document_id) = entry.document_id {
            record["document_id"] = Value::String(document_id);
        }
        if let Some(user_email) = entry.user_email {
            record["user_email"] = Value::String(user_email);
        }

        let stored = self
            .entities
            .create(collections::ACTIVITY_LOG, record)
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Entries with `action`, in log order.
    ///
    /// Records that do not decode as entries are skipped.
    pub async fn find(&self, action: &str) -> AppResult<Vec<ActivityEntry>> {
        let rows = self
            .entities
            .filter(collections::ACTIVITY_LOG, json!({ "action": action }))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<ActivityEntry>(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, action, "Skipping malformed activity entry");
                    None
                }
            })
            .collect())
    }
}
