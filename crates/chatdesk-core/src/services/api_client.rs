use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};

/// Thin JSON client over the backend's `/api` surface.
///
/// Status codes are mapped to [`ApiError`] in one place so every service
/// reports conflicts, auth failures and server messages the same way.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an `/api`-relative path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builder without the per-request timeout, for streaming responses.
    pub fn streaming_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .timeout(self.request_timeout)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!(path = %path, "GET");
        let response = self.request(Method::GET, path).send().await?;
        let response = check_status(response).await?;
        decode_json(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(path = %path, "POST");
        let response = self.request(Method::POST, path).json(body).send().await?;
        let response = check_status(response).await?;
        decode_json(response).await
    }

    /// POST whose response body is ignored.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        debug!(path = %path, "POST");
        let response = self.request(Method::POST, path).json(body).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// PUT a JSON document. With `create_only` the write fails with
    /// [`ApiError::Conflict`] if something already lives at `path`.
    pub async fn put_json<B, T>(&self, path: &str, body: &B, create_only: bool) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(path = %path, create_only, "PUT");
        let mut request = self.request(Method::PUT, path).json(body);
        if create_only {
            request = request.header("If-None-Match", "*");
        }
        let response = check_status(request.send().await?).await?;
        decode_json(response).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        debug!(path = %path, "DELETE");
        let response = self.request(Method::DELETE, path).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let text = response.text().await?;
    // Some endpoints answer 200 with an empty body.
    let text = if text.trim().is_empty() { "null" } else { &text };
    Ok(serde_json::from_str(text)?)
}

/// Map non-2xx responses to typed errors, pulling the backend's `message` when present.
pub(crate) async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Err(ApiError::Conflict),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = error_message_from_body(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            warn!(status = status.as_u16(), message = %message, "Backend request failed");
            Err(ApiError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// `{"message": ".."}` or `{"error": {"message": ".."}}`.
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
