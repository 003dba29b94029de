//! Per-run and per-step execution context.
//!
//! A [`RunContext`] lives for one run of one workflow against one document.
//! Before every step the executor fetches the document again and hands the
//! handler a borrowed [`StepContext`] built from that fresh snapshot. Writes a
//! step makes to the document are collected on the run as
//! [`DocumentMutation`]s so the run can report what it changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::prompts::PromptRenderer;
use super::steps::StepError;
use crate::platform::{Caller, Document, Integrations};

/// Default `Translate` target language.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

/// Caller-supplied run metadata.
///
/// Unrecognized keys are kept in `extra` and carried into the execution
/// record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunMetadata {
    pub fn target_language(&self) -> &str {
        non_blank(self.target_language.as_deref()).unwrap_or(DEFAULT_TARGET_LANGUAGE)
    }

    /// `notificationEmail`, falling back to `userEmail`.
    pub fn notification_recipient(&self) -> Option<&str> {
        non_blank(self.notification_email.as_deref())
            .or_else(|| non_blank(self.user_email.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A document write made by a step.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentMutation {
    pub step: String,
    pub patch: Value,
    pub applied_at: DateTime<Utc>,
}

/// State of one workflow run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub workflow_id: String,
    pub document_id: String,
    pub trigger_event: String,
    pub metadata: RunMetadata,
    pub caller: Option<Caller>,
    mutations: Vec<DocumentMutation>,
}

impl RunContext {
    pub fn new(
        workflow_id: impl Into<String>,
        document_id: impl Into<String>,
        trigger_event: impl Into<String>,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            document_id: document_id.into(),
            trigger_event: trigger_event.into(),
            metadata,
            caller: None,
            mutations: Vec::new(),
        }
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub(crate) fn record_mutation(&mut self, step: &str, patch: Value) {
        self.mutations.push(DocumentMutation {
            step: step.to_string(),
            patch,
            applied_at: Utc::now(),
        });
    }

    /// Document writes made so far, in order.
    pub fn mutations(&self) -> &[DocumentMutation] {
        &self.mutations
    }

    /// Borrowed view handed to a step handler.
    pub fn step<'a>(
        &'a self,
        document: &'a Document,
        integrations: &'a dyn Integrations,
        prompts: &'a PromptRenderer,
    ) -> StepContext<'a> {
        StepContext {
            workflow_id: &self.workflow_id,
            trigger_event: &self.trigger_event,
            metadata: &self.metadata,
            document,
            integrations,
            prompts,
        }
    }
}

/// What a step handler sees: the fresh document and the run's inputs.
pub struct StepContext<'a> {
    pub workflow_id: &'a str,
    pub trigger_event: &'a str,
    pub metadata: &'a RunMetadata,
    pub document: &'a Document,
    pub integrations: &'a dyn Integrations,
    prompts: &'a PromptRenderer,
}

impl StepContext<'_> {
    /// Render a prompt template against this step's document and metadata.
    pub fn render(&self, template: &str) -> Result<String, StepError> {
        self.prompts.render(
            template,
            minijinja::context! {
                document => self.document,
                document_name => self.document.display_name(),
                metadata => self.metadata,
                workflow_id => self.workflow_id,
                trigger_event => self.trigger_event,
            },
        )
    }
}
