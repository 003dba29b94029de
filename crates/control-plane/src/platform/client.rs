//! Platform HTTP client.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    Authenticator, Caller, EmailMessage, EntityStore, Integrations, LlmRequest, PlatformError,
    PlatformResult,
};
use crate::config::PlatformConfig;

/// HTTP client for the backend platform API.
#[derive(Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    app_id: String,
    api_key: Option<String>,
}

impl PlatformClient {
    /// Create a client; every request carries `PLATFORM_TIMEOUT_SECS`.
    pub fn new(config: &PlatformConfig) -> PlatformResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn app_url(&self, path: &str) -> String {
        format!("{}/api/apps/{}/{}", self.base_url, self.app_id, path)
    }

    fn entity_url(&self, collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => self.app_url(&format!("entities/{}/{}", collection, id)),
            None => self.app_url(&format!("entities/{}", collection)),
        }
    }

    /// Attach the service key.
    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api_key", key),
            None => request,
        }
    }
}

/// Decode a successful response or turn the status into an error.
async fn decode<T: DeserializeOwned>(response: Response) -> PlatformResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PlatformError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl EntityStore for PlatformClient {
    async fn ping(&self) -> bool {
        self.with_key(self.client.get(format!("{}/health", self.base_url)))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn create(&self, collection: &str, data: Value) -> PlatformResult<Value> {
        let response = self
            .with_key(self.client.post(self.entity_url(collection, None)))
            .json(&data)
            .send()
            .await?;
        decode(response).await
    }

    async fn get(&self, collection: &str, id: &str) -> PlatformResult<Option<Value>> {
        let response = self
            .with_key(self.client.get(self.entity_url(collection, Some(id))))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> PlatformResult<Value> {
        let response = self
            .with_key(self.client.put(self.entity_url(collection, Some(id))))
            .json(&patch)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        decode(response).await
    }

    async fn filter(&self, collection: &str, query: Value) -> PlatformResult<Vec<Value>> {
        let response = self
            .with_key(self.client.get(self.entity_url(collection, None)))
            .query(&[("q", query.to_string())])
            .send()
            .await?;
        decode(response).await
    }

    async fn list(&self, collection: &str) -> PlatformResult<Vec<Value>> {
        let response = self
            .with_key(self.client.get(self.entity_url(collection, None)))
            .send()
            .await?;
        decode(response).await
    }
}

#[async_trait]
impl Integrations for PlatformClient {
    async fn invoke_function(&self, name: &str, payload: Value) -> PlatformResult<Value> {
        let response = self
            .with_key(
                self.client
                    .post(self.app_url(&format!("functions/{}", name))),
            )
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(PlatformError::Function {
                name: name.to_string(),
                message,
            });
        }

        let mut body: Value = response.json().await?;
        Ok(body
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn invoke_llm(&self, request: LlmRequest) -> PlatformResult<Value> {
        let response = self
            .with_key(self.client.post(self.app_url("integrations/llm")))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    async fn send_email(&self, message: EmailMessage) -> PlatformResult<()> {
        let response = self
            .with_key(self.client.post(self.app_url("integrations/email")))
            .json(&message)
            .send()
            .await?;
        decode::<Value>(response).await.map(|_| ())
    }
}

#[async_trait]
impl Authenticator for PlatformClient {
    async fn authenticate(&self, token: &str) -> PlatformResult<Option<Caller>> {
        let response = self
            .client
            .get(self.app_url("auth/me"))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => decode(response).await.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PlatformClient {
        PlatformClient::new(&PlatformConfig {
            base_url: format!("{}/", server.uri()),
            app_id: "app1".to_string(),
            api_key: Some("svc-key".to_string()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_timeout_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/apps/app1/entities/Document/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "slow"}))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = PlatformClient::new(&PlatformConfig {
            base_url: server.uri(),
            app_id: "app1".to_string(),
            api_key: None,
            timeout_secs: 1,
        })
        .unwrap();

        let err = client.get("Document", "slow").await.unwrap_err();
        assert!(matches!(err, PlatformError::Http(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_get_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/apps/app1/entities/Document/d1"))
            .and(header("api_key", "svc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "d1"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let doc = client.get("Document", "d1").await.unwrap();
        assert_eq!(doc, Some(json!({"id": "d1"})));
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/apps/app1/entities/Document/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.get("Document", "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_filter_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/apps/app1/entities/ActivityLog"))
            .and(query_param("q", r#"{"action":"workflow_created"}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": "a1"}, {"id": "a2"}])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let rows = client
            .filter("ActivityLog", json!({"action": "workflow_created"}))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_function_unwraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/apps/app1/functions/ocrProcessor"))
            .and(body_json(json!({"document_id": "d1"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"text": "hello"}})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data = client
            .invoke_function("ocrProcessor", json!({"document_id": "d1"}))
            .await
            .unwrap();
        assert_eq!(data, json!({"text": "hello"}));
    }

    #[tokio::test]
    async fn test_invoke_function_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/apps/app1/functions/autoTagger"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .invoke_function("autoTagger", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Function 'autoTagger' failed: boom");
    }

    #[tokio::test]
    async fn test_authenticate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/apps/app1/auth/me"))
            .and(header("authorization", "Bearer good"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "u1", "email": "ana@example.com"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/apps/app1/auth/me"))
            .and(header("authorization", "Bearer bad"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let caller = client.authenticate("good").await.unwrap().unwrap();
        assert_eq!(caller.email, "ana@example.com");
        assert!(client.authenticate("bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/apps/app1/integrations/email"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .send_email(EmailMessage {
                to: "a@example.com".to_string(),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Status { status: 503, .. }));
    }
}
