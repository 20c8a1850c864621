use crate::provider::{ChatRequest, CompletionResponse, Error, LlmApi};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
/// Cap server-requested retry delays to prevent excessively long waits.
const MAX_RETRY_DELAY: u64 = 60;

/// Classify a provider error, returning the category if it is transient.
pub(crate) fn retryable_category(err: &Error) -> Option<&'static str> {
    match err {
        Error::RateLimited { .. } => Some("Rate limited"),
        Error::Authentication(_) => None,
        Error::Http(e) if e.is_timeout() => Some("Request timed out"),
        Error::Http(e) if e.is_connect() => Some("Network error"),
        Error::Http(e) => e
            .status()
            .filter(reqwest::StatusCode::is_server_error)
            .map(|_| "Server error")
            .or_else(|| classify_message(&e.to_string())),
        Error::Api(msg) => classify_message(msg),
    }
}

fn classify_message(err: &str) -> Option<&'static str> {
    let err_lower = err.to_lowercase();

    if err.contains("429") || err_lower.contains("rate limit") {
        return Some("Rate limited");
    }

    if err_lower.contains("timeout")
        || err_lower.contains("timed out")
        || err_lower.contains("deadline exceeded")
    {
        return Some("Request timed out");
    }

    if err_lower.contains("connection")
        || err_lower.contains("network")
        || err_lower.contains("dns")
    {
        return Some("Network error");
    }

    if err.contains("HTTP 500")
        || err.contains("HTTP 502")
        || err.contains("HTTP 503")
        || err.contains("HTTP 504")
        || err_lower.contains("internal error")
        || err_lower.contains("service unavailable")
        || err_lower.contains("overloaded")
    {
        return Some("Server error");
    }

    None
}

/// Delay before retry `attempt` (1-based): the server's hint or 2^attempt seconds.
fn retry_delay(attempt: u32, server_retry_after: Option<u64>) -> u64 {
    server_retry_after
        .unwrap_or(1u64 << attempt)
        .min(MAX_RETRY_DELAY)
}

/// Non-streaming completion with retry on transient failures.
pub(crate) async fn complete_with_retry(
    provider: &Arc<dyn LlmApi>,
    request: &ChatRequest,
) -> Result<CompletionResponse, Error> {
    let mut retry_count = 0u32;

    loop {
        debug!(
            provider = provider.id(),
            messages = request.messages.len(),
            "Requesting completion"
        );

        match provider.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                let server_retry_after = if let Error::RateLimited { retry_after } = &e {
                    *retry_after
                } else {
                    None
                };
                if let Some(reason) = retryable_category(&e)
                    && retry_count < MAX_RETRIES
                {
                    retry_count += 1;
                    let delay = retry_delay(retry_count, server_retry_after);
                    warn!(
                        "{}, retrying in {}s (attempt {}/{})",
                        reason, delay, retry_count, MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Message, Role, Usage};
    use async_trait::async_trait;
    use std::borrow::Cow;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_rate_limit_detection() {
        assert_eq!(
            retryable_category(&Error::RateLimited { retry_after: None }),
            Some("Rate limited")
        );
        assert_eq!(
            retryable_category(&Error::Api("HTTP 429: quota".into())),
            Some("Rate limited")
        );
    }

    #[test]
    fn test_server_error_detection() {
        assert_eq!(
            retryable_category(&Error::Api("HTTP 503: The model is overloaded".into())),
            Some("Server error")
        );
        assert_eq!(
            retryable_category(&Error::Api("HTTP 500: Internal error encountered.".into())),
            Some("Server error")
        );
    }

    #[test]
    fn test_timeout_and_network_detection() {
        assert_eq!(
            retryable_category(&Error::Api("deadline exceeded".into())),
            Some("Request timed out")
        );
        assert_eq!(
            retryable_category(&Error::Api("connection reset by peer".into())),
            Some("Network error")
        );
    }

    #[test]
    fn test_non_retryable() {
        assert_eq!(
            retryable_category(&Error::Api("HTTP 400: Invalid argument".into())),
            None
        );
        assert_eq!(
            retryable_category(&Error::Authentication("HTTP 500 proxy said no".into())),
            None
        );
        assert_eq!(
            retryable_category(&Error::Api("Response blocked by the model (SAFETY)".into())),
            None
        );
    }

    #[test]
    fn test_retry_delay() {
        assert_eq!(retry_delay(1, None), 2);
        assert_eq!(retry_delay(3, None), 8);
        assert_eq!(retry_delay(1, Some(5)), 5);
        assert_eq!(retry_delay(1, Some(600)), MAX_RETRY_DELAY);
    }

    /// Fails with the queued errors, then succeeds.
    struct FlakyApi {
        failures: Mutex<Vec<Error>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmApi for FlakyApi {
        fn id(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<CompletionResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            Ok(CompletionResponse {
                message: Message::text(Role::Assistant, "ok"),
                usage: Usage::default(),
            })
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gemini-2.5-flash".into(),
            messages: Arc::new(vec![Message::text(Role::User, "hi")]),
            system: Some(Cow::Borrowed("system")),
            tools: Arc::new(vec![]),
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let api = Arc::new(FlakyApi {
            failures: Mutex::new(vec![
                Error::Api("HTTP 503: overloaded".into()),
                Error::RateLimited {
                    retry_after: Some(1),
                },
            ]),
            calls: AtomicUsize::new(0),
        });
        let provider: Arc<dyn LlmApi> = api.clone();

        let response = complete_with_retry(&provider, &request()).await.unwrap();
        assert_eq!(response.message.joined_text(), "ok");
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let api = Arc::new(FlakyApi {
            failures: Mutex::new(
                (0..5)
                    .map(|_| Error::RateLimited { retry_after: None })
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        });
        let provider: Arc<dyn LlmApi> = api.clone();

        let err = complete_with_retry(&provider, &request()).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));
        assert_eq!(api.calls.load(Ordering::SeqCst), MAX_RETRIES as usize + 1);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let api = Arc::new(FlakyApi {
            failures: Mutex::new(vec![Error::Api("HTTP 400: bad request".into())]),
            calls: AtomicUsize::new(0),
        });
        let provider: Arc<dyn LlmApi> = api.clone();

        assert!(complete_with_retry(&provider, &request()).await.is_err());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
