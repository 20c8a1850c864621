//! Google Gemini via the public `generativelanguage` API.

mod client;
mod convert;
mod types;

pub use client::{GEMINI_ENDPOINT, GeminiClient, GeminiConnector};
