//! LLM provider abstraction.
//!
//! A provider-neutral message model (`Message`, `ContentBlock`, `ChatRequest`)
//! plus the Gemini backend used by the companion agent.
//!
//! # Example
//!
//! ```ignore
//! use aura::provider::{Connector, Credential, GeminiConnector};
//!
//! let credential = Credential::new(key).expect("non-empty key");
//! let llm = GeminiConnector::default().connect(&credential, "gemini-2.5-flash").await?;
//! let response = llm.complete(request).await?;
//! ```

mod client;
mod credential;
mod error;
mod gemini;
mod http;
mod types;

pub use client::{Connector, LlmApi};
pub use credential::Credential;
pub use error::{Error, format_api_error};
pub use gemini::{GEMINI_ENDPOINT, GeminiClient, GeminiConnector};
pub use types::*;

/// Environment variables checked for a Google AI key, in order.
pub const GOOGLE_API_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];
