//! HTTP transport for the Cloud Eye REST API.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::ProviderError;

/// Header carrying the pre-issued token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Maximum length of response body to log.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters before logging it.
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"error": {"message": ..}}`, `{"message": ..}` and
/// `{"error_msg": ..}`; anything else is returned sanitized.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("message"),
            value.get("error_msg"),
        ];
        if let Some(msg) = candidates.into_iter().flatten().find_map(Value::as_str) {
            return msg.to_string();
        }
    }
    sanitize_for_log(body)
}

/// Map a non-success status to the error taxonomy.
pub fn error_for_status(status: StatusCode, body: &str) -> ProviderError {
    let message = extract_message(body);
    match status.as_u16() {
        400 => ProviderError::InvalidRequest(message),
        401 | 403 => ProviderError::PermissionDenied(message),
        404 => ProviderError::NotFound(message),
        409 => ProviderError::Conflict(message),
        429 => ProviderError::ResourceExhausted(message),
        500 | 502 | 503 | 504 => ProviderError::Unavailable(message),
        code => ProviderError::Remote {
            status: code,
            message,
        },
    }
}

/// HTTP client wrapper that authenticates every request with `X-Auth-Token`.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    token: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client with the given token and per-request timeout.
    pub fn new(token: impl Into<String>, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("ces-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> Result<Value, ProviderError> {
        self.send(Method::GET, url, None).await
    }

    /// Make a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value, ProviderError> {
        self.send(Method::POST, url, Some(body)).await
    }

    /// Make a PUT request with a JSON body.
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value, ProviderError> {
        self.send(Method::PUT, url, Some(body)).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, url: &str) -> Result<Value, ProviderError> {
        self.send(Method::DELETE, url, None).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        debug!(%method, url, "sending request");

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(AUTH_TOKEN_HEADER, &self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(%method, url, status = status.as_u16(), body = %sanitize_for_log(&text), "API error");
            return Err(error_for_status(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}
