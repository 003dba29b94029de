//! In-process platform used by tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    Authenticator, Caller, EmailMessage, EntityStore, Integrations, LlmRequest, PlatformError,
    PlatformResult,
};

/// Scripted outcome for a named function or LLM prompt.
type Scripted = Result<Value, String>;

/// Platform double that keeps collections, scripted integration responses
/// and every outgoing call in memory.
#[derive(Default)]
pub struct MemoryPlatform {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    functions: RwLock<HashMap<String, Scripted>>,
    /// (prompt fragment, outcome); the first fragment contained in the prompt wins
    llm: RwLock<Vec<(String, Scripted)>>,
    email_failure: RwLock<Option<String>>,
    tokens: RwLock<HashMap<String, Caller>>,
    function_calls: RwLock<Vec<(String, Value)>>,
    llm_calls: RwLock<Vec<LlmRequest>>,
    sent_emails: RwLock<Vec<EmailMessage>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is (it must carry its own `id`).
    pub async fn seed(&self, collection: &str, record: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    /// Make a named function return `data`.
    pub async fn on_function(&self, name: &str, data: Value) {
        self.functions
            .write()
            .await
            .insert(name.to_string(), Ok(data));
    }

    /// Make a named function fail with `message`.
    pub async fn fail_function(&self, name: &str, message: &str) {
        self.functions
            .write()
            .await
            .insert(name.to_string(), Err(message.to_string()));
    }

    /// Answer LLM prompts containing `fragment` with `response`.
    pub async fn on_llm(&self, fragment: &str, response: Value) {
        self.llm
            .write()
            .await
            .push((fragment.to_string(), Ok(response)));
    }

    /// Fail LLM prompts containing `fragment`.
    pub async fn fail_llm(&self, fragment: &str, message: &str) {
        self.llm
            .write()
            .await
            .push((fragment.to_string(), Err(message.to_string())));
    }

    pub async fn fail_email(&self, message: &str) {
        *self.email_failure.write().await = Some(message.to_string());
    }

    /// Accept `token` as a valid session for `caller`.
    pub async fn add_token(&self, token: &str, caller: Caller) {
        self.tokens.write().await.insert(token.to_string(), caller);
    }

    pub async fn function_calls(&self) -> Vec<(String, Value)> {
        self.function_calls.read().await.clone()
    }

    pub async fn llm_calls(&self) -> Vec<LlmRequest> {
        self.llm_calls.read().await.clone()
    }

    pub async fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent_emails.read().await.clone()
    }
}

fn matches_query(record: &Value, query: &Map<String, Value>) -> bool {
    query
        .iter()
        .all(|(key, expected)| record.get(key) == Some(expected))
}

#[async_trait]
impl EntityStore for MemoryPlatform {
    async fn create(&self, collection: &str, data: Value) -> PlatformResult<Value> {
        let Value::Object(mut record) = data else {
            return Err(PlatformError::Decode(format!(
                "{} record must be a JSON object",
                collection
            )));
        };

        record
            .entry("id")
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        record
            .entry("created_date")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));

        let record = Value::Object(record);
        self.seed(collection, record.clone()).await;
        Ok(record)
    }

    async fn get(&self, collection: &str, id: &str) -> PlatformResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|records| {
            records
                .iter()
                .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
                .cloned()
        }))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> PlatformResult<Value> {
        let not_found = || PlatformError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };

        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
            })
            .ok_or_else(not_found)?;

        if let (Value::Object(target), Value::Object(fields)) = (&mut *record, patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
            target.insert(
                "updated_date".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        Ok(record.clone())
    }

    async fn filter(&self, collection: &str, query: Value) -> PlatformResult<Vec<Value>> {
        let query = match query {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(PlatformError::Decode(format!(
                    "filter query must be an object, got {}",
                    other
                )))
            }
        };

        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches_query(r, &query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list(&self, collection: &str) -> PlatformResult<Vec<Value>> {
        self.filter(collection, Value::Null).await
    }
}

#[async_trait]
impl Integrations for MemoryPlatform {
    async fn invoke_function(&self, name: &str, payload: Value) -> PlatformResult<Value> {
        self.function_calls
            .write()
            .await
            .push((name.to_string(), payload));

        match self.functions.read().await.get(name) {
            Some(Ok(data)) => Ok(data.clone()),
            Some(Err(message)) => Err(PlatformError::Function {
                name: name.to_string(),
                message: message.clone(),
            }),
            None => Err(PlatformError::Function {
                name: name.to_string(),
                message: "function is not deployed".to_string(),
            }),
        }
    }

    async fn invoke_llm(&self, request: LlmRequest) -> PlatformResult<Value> {
        let outcome = self
            .llm
            .read()
            .await
            .iter()
            .find(|(fragment, _)| request.prompt.contains(fragment.as_str()))
            .map(|(_, outcome)| outcome.clone());

        self.llm_calls.write().await.push(request);

        match outcome {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(PlatformError::Unavailable(message)),
            None => Err(PlatformError::Unavailable(
                "no LLM response registered for prompt".to_string(),
            )),
        }
    }

    async fn send_email(&self, message: EmailMessage) -> PlatformResult<()> {
        if let Some(reason) = self.email_failure.read().await.clone() {
            return Err(PlatformError::Unavailable(reason));
        }
        self.sent_emails.write().await.push(message);
        Ok(())
    }
}

#[async_trait]
impl Authenticator for MemoryPlatform {
    async fn authenticate(&self, token: &str) -> PlatformResult<Option<Caller>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}
