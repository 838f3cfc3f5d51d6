use crate::error::{ApiError, ApiResult};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Uniform outcome of a single HTTP exchange.
///
/// Transport failures never surface as `Err` here: they come back with
/// `ok == false`, `status == 0` and the cause in `error`, so every caller
/// handles one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub body: String,
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: 0,
            status_text: String::new(),
            body: String::new(),
            error: Some(message.into()),
        }
    }

    /// Converts into the body text, mapping failures onto `ApiError`.
    pub fn into_body(self, url: &str) -> ApiResult<String> {
        if self.ok {
            return Ok(self.body);
        }
        if self.status == 0 {
            return Err(ApiError::Network {
                url: url.to_string(),
                message: self.error.unwrap_or_else(|| "unknown transport error".to_string()),
            });
        }
        if self.status == 401 {
            return Err(ApiError::Unauthorized);
        }
        Err(ApiError::Http {
            status: self.status,
            status_text: self.status_text,
            body: self.body,
        })
    }

    /// Decodes the body as JSON. An empty body decodes as `null`, which lets
    /// `()` and `Option<T>` targets accept `204 No Content`.
    pub fn json<T: DeserializeOwned>(self, url: &str) -> ApiResult<T> {
        let body = self.into_body(url)?;
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| {
            warn!("Failed to decode response from {}: {}", url, e);
            ApiError::Decode(e.to_string())
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("mediadash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    #[instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> ApiResponse {
        debug!("Making {} request", method);
        let mut request = self.client.request(method.clone(), url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("HTTP {} failed before a response: {}", method, e);
                return ApiResponse::transport_failure(e.to_string());
            }
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read response body: {}", e);
                return ApiResponse {
                    ok: false,
                    status: status.as_u16(),
                    status_text,
                    body: String::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        if !status.is_success() {
            error!("HTTP {} failed with status: {}", method, status);
        }

        ApiResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            status_text,
            body,
            error: None,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> ApiResult<T> {
        self.execute(Method::GET, url, headers, None).await.json(url)
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, url, headers, Some(body)).await.json(url)
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> ApiResult<T> {
        self.execute(Method::DELETE, url, headers, None).await.json(url)
    }

    pub async fn delete(&self, url: &str, headers: &[(&str, String)]) -> ApiResult<()> {
        self.execute(Method::DELETE, url, headers, None)
            .await
            .into_body(url)
            .map(|_| ())
    }
}
