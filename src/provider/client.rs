//! Provider-facing traits: model calls and credential-checked connections.

use super::credential::Credential;
use super::error::Error;
use super::types::{ChatRequest, CompletionResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for LLM operations.
#[async_trait]
pub trait LlmApi: Send + Sync {
    /// Get the provider identifier.
    fn id(&self) -> &str;
    /// Get a non-streaming chat completion.
    async fn complete(&self, request: ChatRequest) -> Result<CompletionResponse, Error>;
}

/// Opens a model connection for a credential.
///
/// Implementations verify the credential before returning, so a bad key is
/// reported at connect time instead of on the first chat turn.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credential: &Credential, model: &str)
    -> Result<Arc<dyn LlmApi>, Error>;
}
