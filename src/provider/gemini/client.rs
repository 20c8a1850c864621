//! Gemini API client (Google AI Studio keys).

use super::types::{GeminiModelInfo, GeminiRequest, GeminiResponse};
use crate::provider::client::{Connector, LlmApi};
use crate::provider::credential::Credential;
use crate::provider::error::Error;
use crate::provider::http::{AuthConfig, HttpClient};
use crate::provider::types::{ChatRequest, CompletionResponse};
use async_trait::async_trait;
use std::sync::Arc;

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Normalize model name (accept `models/` and `google/` prefixes).
fn normalize_model_name(model: &str) -> String {
    let trimmed = model.trim();
    trimmed
        .strip_prefix("models/")
        .or_else(|| trimmed.strip_prefix("google/"))
        .unwrap_or(trimmed)
        .to_string()
}

/// Gemini API client.
#[derive(Debug)]
pub struct GeminiClient {
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(credential: &Credential) -> Self {
        Self::with_base_url(GEMINI_ENDPOINT, credential)
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_base_url(base_url: impl Into<String>, credential: &Credential) -> Self {
        let http = HttpClient::new(
            base_url,
            AuthConfig {
                header: API_KEY_HEADER.to_string(),
                key: credential.expose().to_string(),
            },
        );
        Self { http }
    }

    /// Fetch model metadata; fails with `Error::Authentication` on a rejected key.
    pub async fn verify(&self, model: &str) -> Result<(), Error> {
        let model = normalize_model_name(model);
        let info: GeminiModelInfo = self.http.get_json(&format!("/models/{model}")).await?;
        tracing::debug!(
            model = %info.name,
            display_name = info.display_name.as_deref().unwrap_or(""),
            "Gemini credential verified"
        );
        Ok(())
    }
}

#[async_trait]
impl LlmApi for GeminiClient {
    fn id(&self) -> &str {
        "google"
    }

    async fn complete(&self, request: ChatRequest) -> Result<CompletionResponse, Error> {
        let model = normalize_model_name(&request.model);
        let body = GeminiRequest::from_chat_request(&request);

        tracing::debug!(
            model = %model,
            contents = body.contents.len(),
            tools = request.tools.len(),
            "Gemini generateContent"
        );

        let response: GeminiResponse = self
            .http
            .post_json(&format!("/models/{model}:generateContent"), &body)
            .await?;

        if let Some(reason) = response.block_reason() {
            return Err(Error::Api(format!("Response blocked by the model ({reason})")));
        }

        let usage = response.usage();
        Ok(CompletionResponse {
            message: response.into_message(),
            usage,
        })
    }
}

/// Connects to Gemini, verifying the key against the configured model.
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    base_url: String,
}

impl Default for GeminiConnector {
    fn default() -> Self {
        Self {
            base_url: GEMINI_ENDPOINT.to_string(),
        }
    }
}

impl GeminiConnector {
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Connector for GeminiConnector {
    async fn connect(
        &self,
        credential: &Credential,
        model: &str,
    ) -> Result<Arc<dyn LlmApi>, Error> {
        let client = GeminiClient::with_base_url(self.base_url.clone(), credential);
        client.verify(model).await?;
        Ok(Arc::new(client))
    }
}
