//! Built-in document processing steps.
//!
//! Most steps adapt one platform capability: they shape the request from the
//! step context and wrap the response in `{action, ...}`. `Compress` is
//! computed in process and `Auto-Tag` is the only step that writes to the
//! document.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::context::StepContext;
use super::prompts::{EMAIL_BODY, EMAIL_SUBJECT, EXTRACT_DATA_PROMPT, QUALITY_CHECK_PROMPT};
use super::steps::{StepError, StepHandler, StepOutput, StepRegistry};
use crate::platform::{EmailMessage, LlmRequest};

/// Platform function names.
pub mod functions {
    pub const OCR_PROCESSOR: &str = "ocrProcessor";
    pub const AI_DOCUMENT_ASSISTANT: &str = "aiDocumentAssistant";
    pub const AUTO_TAGGER: &str = "autoTagger";
}

/// `Compress` output size as a fraction of the input.
pub const COMPRESSION_RATIO: f64 = 0.7;

/// Registry with every built-in step.
pub fn create_default_registry() -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register(OcrStep);
    registry.register(TranslateStep);
    registry.register(CompressStep);
    registry.register(SummarizeStep);
    registry.register(ExtractDataStep);
    registry.register(AutoTagStep);
    registry.register(QualityCheckStep);
    registry.register(EmailNotificationStep);
    registry
}

pub struct OcrStep;

#[async_trait]
impl StepHandler for OcrStep {
    fn name(&self) -> &'static str {
        "OCR"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let result = ctx
            .integrations
            .invoke_function(
                functions::OCR_PROCESSOR,
                json!({
                    "document_id": ctx.document.id,
                    "file_url": ctx.document.file_url,
                    "enhance_quality": true,
                }),
            )
            .await?;

        Ok(StepOutput::new(json!({ "action": self.name(), "result": result })))
    }
}

pub struct TranslateStep;

#[async_trait]
impl StepHandler for TranslateStep {
    fn name(&self) -> &'static str {
        "Translate"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let language = ctx.metadata.target_language();
        let result = ctx
            .integrations
            .invoke_function(
                functions::AI_DOCUMENT_ASSISTANT,
                json!({
                    "document_id": ctx.document.id,
                    "task": "translate",
                    "target_language": language,
                }),
            )
            .await?;

        Ok(StepOutput::new(json!({
            "action": self.name(),
            "language": language,
            "result": result,
        })))
    }
}

/// Size estimate only; the file itself is not touched.
pub struct CompressStep;

/// `floor(size * 0.7)`.
pub fn compressed_size(original_size: u64) -> u64 {
    (original_size as f64 * COMPRESSION_RATIO).floor() as u64
}

#[async_trait]
impl StepHandler for CompressStep {
    fn name(&self) -> &'static str {
        "Compress"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let original_size = ctx.document.file_size.unwrap_or(0);
        Ok(StepOutput::new(json!({
            "action": self.name(),
            "original_size": original_size,
            "compressed_size": compressed_size(original_size),
        })))
    }
}

pub struct SummarizeStep;

#[async_trait]
impl StepHandler for SummarizeStep {
    fn name(&self) -> &'static str {
        "Summarize"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let result = ctx
            .integrations
            .invoke_function(
                functions::AI_DOCUMENT_ASSISTANT,
                json!({
                    "document_id": ctx.document.id,
                    "task": "summarize",
                }),
            )
            .await?;

        Ok(StepOutput::new(json!({ "action": self.name(), "result": result })))
    }
}

pub struct ExtractDataStep;

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn extract_data_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entities": string_array(),
            "dates": string_array(),
            "amounts": string_array(),
            "key_info": string_array(),
        }
    })
}

#[async_trait]
impl StepHandler for ExtractDataStep {
    fn name(&self) -> &'static str {
        "Extract Data"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let result = ctx
            .integrations
            .invoke_llm(LlmRequest {
                prompt: ctx.render(EXTRACT_DATA_PROMPT)?,
                file_urls: ctx.document.file_urls(),
                response_json_schema: Some(extract_data_schema()),
            })
            .await?;

        Ok(StepOutput::new(json!({ "action": self.name(), "result": result })))
    }
}

/// Tags the document and stores the tags on it.
pub struct AutoTagStep;

#[async_trait]
impl StepHandler for AutoTagStep {
    fn name(&self) -> &'static str {
        "Auto-Tag"
    }

    fn mutates_document(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let response = ctx
            .integrations
            .invoke_function(
                functions::AUTO_TAGGER,
                json!({
                    "document_id": ctx.document.id,
                    "file_url": ctx.document.file_url,
                    "name": ctx.document.name,
                }),
            )
            .await?;

        let tags = match response.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect::<Vec<_>>(),
            _ => {
                return Err(StepError::InvalidResponse {
                    capability: functions::AUTO_TAGGER.to_string(),
                    message: "response has no tags array".to_string(),
                })
            }
        };

        Ok(StepOutput::new(json!({ "action": self.name(), "tags": tags }))
            .with_document_patch(json!({ "tags": tags })))
    }
}

pub struct QualityCheckStep;

fn quality_check_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "quality_score": { "type": "number" },
            "issues": string_array(),
            "recommendations": string_array(),
        }
    })
}

#[async_trait]
impl StepHandler for QualityCheckStep {
    fn name(&self) -> &'static str {
        "Quality Check"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let result = ctx
            .integrations
            .invoke_llm(LlmRequest {
                prompt: ctx.render(QUALITY_CHECK_PROMPT)?,
                file_urls: ctx.document.file_urls(),
                response_json_schema: Some(quality_check_schema()),
            })
            .await?;

        Ok(StepOutput::new(json!({ "action": self.name(), "result": result })))
    }
}

pub struct EmailNotificationStep;

#[async_trait]
impl StepHandler for EmailNotificationStep {
    fn name(&self) -> &'static str {
        "Email Notification"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutput, StepError> {
        let to = ctx
            .metadata
            .notification_recipient()
            .ok_or(StepError::NoRecipient)?;

        ctx.integrations
            .send_email(EmailMessage {
                to: to.to_string(),
                subject: ctx.render(EMAIL_SUBJECT)?,
                body: ctx.render(EMAIL_BODY)?,
            })
            .await?;

        Ok(StepOutput::new(json!({ "action": self.name(), "sent": true })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::{RunContext, RunMetadata};
    use crate::engine::prompts::PromptRenderer;
    use crate::platform::{Document, MemoryPlatform};

    fn document() -> Document {
        Document {
            id: "d1".to_string(),
            name: Some("contract.pdf".to_string()),
            file_url: Some("https://files.example/contract.pdf".to_string()),
            file_size: Some(1000),
            tags: Vec::new(),
        }
    }

    async fn run_step(
        handler: &dyn StepHandler,
        platform: &MemoryPlatform,
        document: &Document,
        metadata: RunMetadata,
    ) -> Result<StepOutput, StepError> {
        let run = RunContext::new("wf-1", &document.id, "document_uploaded", metadata);
        let prompts = PromptRenderer::new();
        handler.run(&run.step(document, platform, &prompts)).await
    }

    #[test]
    fn test_default_registry_has_every_step() {
        let registry = create_default_registry();
        assert_eq!(
            registry.list(),
            vec![
                "Auto-Tag",
                "Compress",
                "Email Notification",
                "Extract Data",
                "OCR",
                "Quality Check",
                "Summarize",
                "Translate",
            ]
        );
        assert!(registry.resolve("Auto-Tag").unwrap().mutates_document());
        assert!(!registry.resolve("OCR").unwrap().mutates_document());
    }

    #[test]
    fn test_compressed_size_floors() {
        assert_eq!(compressed_size(1000), 700);
        assert_eq!(compressed_size(1), 0);
        assert_eq!(compressed_size(3), 2);
        assert_eq!(compressed_size(0), 0);
        for size in [7_u64, 10, 99, 12_345, 1 << 40] {
            assert_eq!(compressed_size(size), (size as f64 * 0.7).floor() as u64);
        }
    }

    #[tokio::test]
    async fn test_compress_missing_size_is_zero() {
        let platform = MemoryPlatform::new();
        let doc = Document {
            file_size: None,
            ..document()
        };

        let out = run_step(&CompressStep, &platform, &doc, RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(
            out.result,
            json!({"action": "Compress", "original_size": 0, "compressed_size": 0})
        );
        assert!(platform.function_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_ocr_requests_enhanced_quality() {
        let platform = MemoryPlatform::new();
        platform
            .on_function(functions::OCR_PROCESSOR, json!({"text": "hello"}))
            .await;

        let out = run_step(&OcrStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(out.result, json!({"action": "OCR", "result": {"text": "hello"}}));
        assert!(out.document_patch.is_none());

        let calls = platform.function_calls().await;
        assert_eq!(calls[0].0, "ocrProcessor");
        assert_eq!(calls[0].1["enhance_quality"], true);
        assert_eq!(calls[0].1["document_id"], "d1");
    }

    #[tokio::test]
    async fn test_translate_uses_target_language() {
        let platform = MemoryPlatform::new();
        platform
            .on_function(functions::AI_DOCUMENT_ASSISTANT, json!({"text": "bonjour"}))
            .await;
        let metadata = RunMetadata {
            target_language: Some("fr".to_string()),
            ..Default::default()
        };

        let out = run_step(&TranslateStep, &platform, &document(), metadata)
            .await
            .unwrap();
        assert_eq!(out.result["language"], "fr");
        assert_eq!(out.result["result"]["text"], "bonjour");

        let calls = platform.function_calls().await;
        assert_eq!(calls[0].1["task"], "translate");
        assert_eq!(calls[0].1["target_language"], "fr");
    }

    #[tokio::test]
    async fn test_translate_defaults_to_english() {
        let platform = MemoryPlatform::new();
        platform
            .on_function(functions::AI_DOCUMENT_ASSISTANT, json!({}))
            .await;

        let out = run_step(&TranslateStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(out.result["language"], "en");
    }

    #[tokio::test]
    async fn test_summarize_task() {
        let platform = MemoryPlatform::new();
        platform
            .on_function(functions::AI_DOCUMENT_ASSISTANT, json!({"summary": "short"}))
            .await;

        let out = run_step(&SummarizeStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(out.result, json!({"action": "Summarize", "result": {"summary": "short"}}));
        assert_eq!(platform.function_calls().await[0].1["task"], "summarize");
    }

    #[tokio::test]
    async fn test_extract_data_sends_schema_and_file() {
        let platform = MemoryPlatform::new();
        let extracted = json!({
            "entities": ["Acme Corp"],
            "dates": ["2024-01-01"],
            "amounts": ["$1,000"],
            "key_info": ["net 30"]
        });
        platform
            .on_llm("Extract structured data", extracted.clone())
            .await;

        let out = run_step(&ExtractDataStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(out.result["result"], extracted);

        let call = &platform.llm_calls().await[0];
        assert!(call.prompt.contains("\"contract.pdf\""));
        assert_eq!(call.file_urls, vec!["https://files.example/contract.pdf"]);
        let schema = call.response_json_schema.as_ref().unwrap();
        assert!(schema["properties"]["key_info"].is_object());
    }

    #[tokio::test]
    async fn test_quality_check() {
        let platform = MemoryPlatform::new();
        platform
            .on_llm(
                "Assess the quality",
                json!({"quality_score": 82, "issues": [], "recommendations": ["add OCR layer"]}),
            )
            .await;

        let out = run_step(&QualityCheckStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(out.result["action"], "Quality Check");
        assert_eq!(out.result["result"]["quality_score"], 82);
    }

    #[tokio::test]
    async fn test_auto_tag_returns_patch() {
        let platform = MemoryPlatform::new();
        platform
            .on_function(functions::AUTO_TAGGER, json!({"tags": ["contract", "legal"]}))
            .await;

        let out = run_step(&AutoTagStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap();
        assert_eq!(out.result, json!({"action": "Auto-Tag", "tags": ["contract", "legal"]}));
        assert_eq!(out.document_patch, Some(json!({"tags": ["contract", "legal"]})));
    }

    #[tokio::test]
    async fn test_auto_tag_without_tags_fails() {
        let platform = MemoryPlatform::new();
        platform
            .on_function(functions::AUTO_TAGGER, json!({"labels": ["x"]}))
            .await;

        let err = run_step(&AutoTagStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_email_prefers_notification_email() {
        let platform = MemoryPlatform::new();
        let metadata = RunMetadata {
            notification_email: Some("alerts@example.com".to_string()),
            user_email: Some("ana@example.com".to_string()),
            ..Default::default()
        };

        let out = run_step(&EmailNotificationStep, &platform, &document(), metadata)
            .await
            .unwrap();
        assert_eq!(out.result, json!({"action": "Email Notification", "sent": true}));

        let sent = platform.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alerts@example.com");
        assert!(sent[0].subject.contains("contract.pdf"));
    }

    #[tokio::test]
    async fn test_email_without_recipient_fails() {
        let platform = MemoryPlatform::new();

        let err = run_step(&EmailNotificationStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No notification recipient");
        assert!(platform.sent_emails().await.is_empty());
    }

    #[tokio::test]
    async fn test_platform_failure_surfaces_as_step_error() {
        let platform = MemoryPlatform::new();
        platform
            .fail_function(functions::OCR_PROCESSOR, "quota exceeded")
            .await;

        let err = run_step(&OcrStep, &platform, &document(), RunMetadata::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
