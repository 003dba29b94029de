//! Step results and the execution record written once per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::RunContext;
use crate::error::AppResult;
use crate::store::{actions, ActivityLog, NewActivity};

/// Outcome of one step, serialized as `{step, status: "success", result}`
/// or `{step, status: "error", error}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Success { result: Value },
    Error { error: String },
}

impl StepResult {
    pub fn success(step: impl Into<String>, result: Value) -> Self {
        Self {
            step: step.into(),
            outcome: StepOutcome::Success { result },
        }
    }

    pub fn error(step: impl Into<String>, error: impl ToString) -> Self {
        Self {
            step: step.into(),
            outcome: StepOutcome::Error {
                error: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Error { error } => Some(error),
            StepOutcome::Success { .. } => None,
        }
    }
}

/// `details` of a `workflow_executed` audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecutionRecord {
    pub workflow_id: String,
    pub workflow_name: String,
    pub document_id: String,
    pub trigger_event: String,
    pub steps_executed: usize,
    pub success_count: usize,
    pub results: Vec<StepResult>,
    #[serde(default)]
    pub metadata: Value,
    pub executed_at: DateTime<Utc>,
}

impl WorkflowExecutionRecord {
    pub fn from_results(
        run: &RunContext,
        workflow_name: &str,
        results: Vec<StepResult>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id: run.workflow_id.clone(),
            workflow_name: workflow_name.to_string(),
            document_id: run.document_id.clone(),
            trigger_event: run.trigger_event.clone(),
            steps_executed: results.len(),
            success_count: results.iter().filter(|r| r.is_success()).count(),
            results,
            metadata: serde_json::to_value(&run.metadata).unwrap_or_default(),
            executed_at,
        }
    }
}

/// Appends execution records to the audit log.
#[derive(Clone)]
pub struct ExecutionRecordWriter {
    log: ActivityLog,
}

impl ExecutionRecordWriter {
    pub fn new(log: ActivityLog) -> Self {
        Self { log }
    }

    /// One write, no retry. Calling twice writes two entries.
    pub async fn write(
        &self,
        record: &WorkflowExecutionRecord,
        user_email: Option<String>,
    ) -> AppResult<()> {
        self.log
            .record(NewActivity {
                action: actions::WORKFLOW_EXECUTED,
                document_id: Some(record.document_id.clone()),
                user_email,
                details: serde_json::to_value(record)?,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::RunMetadata;
    use crate::platform::MemoryPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn run() -> RunContext {
        RunContext::new("wf-1", "d1", "document_uploaded", RunMetadata::default())
    }

    #[test]
    fn test_step_result_wire_shape() {
        let ok = StepResult::success("OCR", json!({"action": "OCR"}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"step": "OCR", "status": "success", "result": {"action": "OCR"}})
        );

        let failed = StepResult::error("Shred", "Unknown workflow step: Shred");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"step": "Shred", "status": "error", "error": "Unknown workflow step: Shred"})
        );

        let parsed: StepResult = serde_json::from_value(
            json!({"step": "Shred", "status": "error", "error": "boom"}),
        )
        .unwrap();
        assert_eq!(parsed.error_message(), Some("boom"));
    }

    #[test]
    fn test_counts_follow_results() {
        let cases = vec![
            vec![],
            vec![StepResult::success("OCR", json!({}))],
            vec![
                StepResult::error("OCR", "down"),
                StepResult::success("Compress", json!({})),
                StepResult::error("Shred", "unknown"),
            ],
        ];

        for results in cases {
            let expected_success = results.iter().filter(|r| r.is_success()).count();
            let expected_len = results.len();
            let record =
                WorkflowExecutionRecord::from_results(&run(), "Flow", results, Utc::now());
            assert_eq!(record.steps_executed, expected_len);
            assert_eq!(record.success_count, expected_success);
        }
    }

    #[tokio::test]
    async fn test_write_appends_each_time() {
        let platform = Arc::new(MemoryPlatform::new());
        let log = ActivityLog::new(platform.clone());
        let writer = ExecutionRecordWriter::new(log.clone());
        let record = WorkflowExecutionRecord::from_results(
            &run(),
            "Flow",
            vec![StepResult::success("Compress", json!({"compressed_size": 700}))],
            Utc::now(),
        );

        writer.write(&record, Some("ana@example.com".to_string())).await.unwrap();
        writer.write(&record, None).await.unwrap();

        let entries = log.find(actions::WORKFLOW_EXECUTED).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].document_id.as_deref(), Some("d1"));
        assert_eq!(entries[0].user_email.as_deref(), Some("ana@example.com"));

        let stored: WorkflowExecutionRecord =
            serde_json::from_value(entries[0].details.clone()).unwrap();
        assert_eq!(stored, record);
    }
}
