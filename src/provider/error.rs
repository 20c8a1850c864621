//! Provider error types.

use serde_json::Value;
use thiserror::Error;

/// Shorten an `HTTP <code>: <body>` error by pulling the message out of a
/// JSON body. Anything that isn't recognizable JSON is returned unchanged.
#[must_use]
pub fn format_api_error(error: &str) -> String {
    let Some(start) = error.find('{') else {
        return error.to_string();
    };
    let Some(message) = serde_json::from_str::<Value>(&error[start..])
        .ok()
        .as_ref()
        .and_then(error_message)
    else {
        return error.to_string();
    };

    match error[..start].trim() {
        "" => message,
        prefix => format!("{prefix} {message}"),
    }
}

/// `{"error": {"message", "code"|"status"}}`, `{"error": "..."}` or `{"message": "..."}`.
fn error_message(json: &Value) -> Option<String> {
    let message = |v: &Value| v.get("message").and_then(Value::as_str).map(str::to_string);

    match json.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(obj) => {
            let msg = message(obj)?;
            let detail = obj
                .get("code")
                .and_then(Value::as_str)
                .map(|c| format!("code: {c}"))
                .or_else(|| {
                    obj.get("status")
                        .and_then(Value::as_str)
                        .map(|s| format!("status: {s}"))
                });
            Some(match detail {
                Some(detail) => format!("{msg} ({detail})"),
                None => msg,
            })
        }
        None => message(json),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },
}

impl Error {
    /// Whether the provider rejected the credential itself.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_invalid_key_error() {
        let error = r#"HTTP 400 Bad Request: {"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            format_api_error(error),
            "HTTP 400 Bad Request: API key not valid. Please pass a valid API key. (status: INVALID_ARGUMENT)"
        );
    }

    #[test]
    fn test_format_string_code_preferred_over_status() {
        let error = r#"HTTP 429: {"error":{"message":"Quota exceeded","code":"rate_limit_exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            format_api_error(error),
            "HTTP 429: Quota exceeded (code: rate_limit_exceeded)"
        );
    }

    #[test]
    fn test_format_bare_error_string() {
        assert_eq!(
            format_api_error(r#"{"error":"Invalid API key"}"#),
            "Invalid API key"
        );
        assert_eq!(
            format_api_error(r#"{"message":"Something went wrong"}"#),
            "Something went wrong"
        );
    }

    #[test]
    fn test_format_passthrough() {
        assert_eq!(format_api_error("Connection refused"), "Connection refused");
        assert_eq!(
            format_api_error("HTTP 500: {invalid json}"),
            "HTTP 500: {invalid json}"
        );
    }

    #[test]
    fn test_authentication_classification() {
        assert!(Error::Authentication("API key not valid".into()).is_authentication());
        assert!(!Error::Api("HTTP 500: boom".into()).is_authentication());
        assert!(!Error::RateLimited { retry_after: Some(3) }.is_authentication());
    }
}
