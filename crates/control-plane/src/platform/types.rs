//! Data shapes exchanged with the platform.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Platform collection names used by the engine.
pub mod collections {
    pub const DOCUMENT: &str = "Document";
    pub const ACTIVITY_LOG: &str = "ActivityLog";
}

/// Authenticated platform user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Caller {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// The attributes of a platform `Document` the engine reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    /// Size in bytes. Fractional values from the platform are truncated.
    #[serde(default, deserialize_with = "deserialize_size")]
    pub file_size: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

impl Document {
    /// File URLs to attach to an LLM call.
    pub fn file_urls(&self) -> Vec<String> {
        self.file_url.iter().cloned().collect()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

/// LLM invocation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    #[serde(default)]
    pub file_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<Value>,
}

/// Outgoing email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_from_platform_record() {
        let doc: Document = serde_json::from_value(json!({
            "id": "d1",
            "name": "contract.pdf",
            "file_url": "https://files.example/contract.pdf",
            "file_size": 1000,
            "created_by": "someone@example.com"
        }))
        .unwrap();

        assert_eq!(doc.file_size, Some(1000));
        assert!(doc.tags.is_empty());
        assert_eq!(doc.file_urls(), vec!["https://files.example/contract.pdf"]);
    }

    #[test]
    fn test_document_lenient_fields() {
        let doc: Document = serde_json::from_value(json!({
            "id": "d2",
            "file_size": 2048.9,
            "tags": ["invoice", 7, null, "q3"]
        }))
        .unwrap();

        assert_eq!(doc.file_size, Some(2048));
        assert_eq!(doc.tags, vec!["invoice", "q3"]);
        assert_eq!(doc.display_name(), "d2");
    }

    #[test]
    fn test_document_null_size() {
        let doc: Document =
            serde_json::from_value(json!({"id": "d3", "file_size": null, "tags": null})).unwrap();
        assert_eq!(doc.file_size, None);
        assert!(doc.tags.is_empty());
    }
}
