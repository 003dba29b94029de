//! Prompt and email templates rendered with minijinja.

use minijinja::{Environment, Value};

use super::steps::StepError;

pub const EXTRACT_DATA_PROMPT: &str = "\
Extract structured data from the document \"{{ document_name }}\".
List the named entities (people, organizations, places), every date, every \
monetary amount, and the key pieces of information a reader needs.
{% if metadata.targetLanguage %}Write the extracted values in {{ metadata.targetLanguage }}.{% endif %}";

pub const QUALITY_CHECK_PROMPT: &str = "\
Assess the quality of the document \"{{ document_name }}\".
Give an overall quality_score from 0 to 100, list concrete issues (legibility, \
missing pages, formatting, inconsistencies) and recommendations to fix them.";

pub const EMAIL_SUBJECT: &str = "OmniPDF: \"{{ document_name }}\" was processed";

pub const EMAIL_BODY: &str = "\
Hello,

Your document \"{{ document_name }}\" was processed by workflow {{ workflow_id }} \
(trigger: {{ trigger_event }}).
{% if document.file_url %}
Open it here: {{ document.file_url }}
{% endif %}
OmniPDF";

/// Renders the templates above.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        Self { env }
    }

    pub fn render(&self, template: &str, ctx: Value) -> Result<String, StepError> {
        let tmpl = self.env.template_from_str(template)?;
        Ok(tmpl.render(ctx)?.trim().to_string())
    }
}
