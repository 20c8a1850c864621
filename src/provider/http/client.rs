//! HTTP client wrapper for LLM API requests.

use crate::provider::error::{Error, format_api_error};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// HTTP request timeout.
const TIMEOUT: Duration = Duration::from_secs(120);
/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Key sent in a custom header (e.g. `x-goog-api-key: {key}`).
#[derive(Clone)]
pub struct AuthConfig {
    pub header: String,
    pub key: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("header", &self.header)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// HTTP client for LLM API requests.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(base_url: impl Into<String>, auth: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            auth,
        }
    }

    /// Build headers including authentication.
    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let name = HeaderName::try_from(self.auth.header.as_str())
            .map_err(|_| Error::Api("API key header name is invalid".into()))?;
        let mut value = HeaderValue::from_str(&self.auth.key).map_err(|_| {
            Error::Authentication("API key contains invalid header characters".into())
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);

        Ok(headers)
    }

    /// Make a GET request and deserialize the response.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let url = format!("{}{path}", self.base_url);
        let headers = self.build_headers()?;

        let response = self.client.get(&url).headers(headers).send().await?;
        read_json(response).await
    }

    /// Make a POST request with JSON body and deserialize the response.
    pub async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, Error> {
        let url = format!("{}{path}", self.base_url);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        read_json(response).await
    }
}

async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, Error> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parse_retry_after(&response);
        return Err(Error::RateLimited { retry_after });
    }
    let text = response.text().await?;

    if !status.is_success() {
        return Err(classify_status(status, &text));
    }

    serde_json::from_str(&text).map_err(|e| Error::Api(format!("Failed to parse response: {e}")))
}

/// Map a non-success response to an error, splitting out credential rejections.
///
/// Google answers an unknown key with 400 `API_KEY_INVALID` rather than 401.
fn classify_status(status: StatusCode, body: &str) -> Error {
    let message = format_api_error(&format!("HTTP {}: {body}", status.as_u16()));
    let key_rejected = body.contains("API_KEY_INVALID") || body.contains("API key not valid");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
        StatusCode::BAD_REQUEST if key_rejected => Error::Authentication(message),
        _ => Error::Api(message),
    }
}

/// Extract and parse `Retry-After` header from a response.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(RETRY_AFTER)?;
    let s = value.to_str().ok()?;
    parse_retry_after_value(s)
}

/// Parse a `Retry-After` header value as seconds.
///
/// Integer and fractional seconds (rounded up). HTTP-date and non-finite
/// values yield None.
fn parse_retry_after_value(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        Some(secs.max(1))
    } else if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() && f > 0.0 {
            Some((f.ceil() as u64).max(1))
        } else {
            None
        }
    } else {
        None
    }
}
