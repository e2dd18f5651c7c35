//! Thin Graph API transport.
//!
//! Both destination platforms speak the same wire dialect: form/query
//! parameters in, JSON out, and errors reported in-band as an `error`
//! object rather than through status codes. The trait seam exists so
//! publisher logic can run against a scripted transport in tests.
//!
//! Access tokens travel as query parameters; they are never logged, only
//! the request path is.

use super::PublishError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

#[async_trait]
pub trait GraphApi: Send + Sync {
    async fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, PublishError>;
    async fn delete(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, PublishError>;
}

/// Reject responses carrying an in-band `error` payload.
///
/// The provider's contract: success bodies look like `{"id": "..."}` or
/// `{"post_id": "..."}`, failures like `{"error": {"message": "...", ...}}`
/// regardless of HTTP status.
pub(crate) fn check_response(value: &Value) -> Result<(), PublishError> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unspecified error")
            .to_string();
        return Err(PublishError::RemoteApi(message));
    }
    Ok(())
}

/// Real Graph API client over reqwest.
pub struct GraphClient {
    base: String,
    client: reqwest::Client,
}

impl GraphClient {
    pub fn new(base: &str) -> Self {
        GraphClient {
            base: base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, PublishError> {
        let url = format!("{}/{}", self.base, path);
        debug!(%path, method = %method, "graph api request");

        let response = self
            .client
            .request(method, &url)
            .query(params)
            .send()
            .await?;
        let value: Value = response.json().await?;
        check_response(&value)?;
        Ok(value)
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, PublishError> {
        self.request(reqwest::Method::POST, path, params).await
    }

    async fn delete(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, PublishError> {
        self.request(reqwest::Method::DELETE, path, params).await
    }
}
