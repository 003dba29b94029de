//! Workflow definition files (YAML or JSON).
//!
//! ```yaml
//! workflow_id: invoice-intake
//! name: Invoice intake
//! description: OCR then pull out totals
//! steps:
//!   - OCR
//!   - Extract Data
//!   - Email Notification
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFile {
    #[serde(default, alias = "id", alias = "workflowId", skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkflowFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let file = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
        .with_context(|| format!("Invalid workflow file: {}", path.display()))?;

        file.check()?;
        Ok(file)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Local sanity check; the server validates again.
    fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Workflow name must not be empty");
        }
        if self.steps.is_empty() {
            tracing::warn!(name = %self.name, "Workflow has no steps");
        }
        Ok(())
    }
}
