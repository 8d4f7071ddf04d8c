//! Retry decorator: resends the identical request on retryable failures.
//!
//! The relay's backend adapter calls its provider exactly once. Any resend
//! happens inside this wrapper and is opt-in through `relay.max_retries`.

use agrishield_core::error::ProviderError;
use agrishield_core::provider::*;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that retries its inner provider with linear backoff.
pub struct RetryProvider {
    inner: Arc<dyn agrishield_core::Provider>,
    max_retries: u32,
    backoff: Duration,
}

impl RetryProvider {
    /// Wrap `inner`, allowing up to `max_retries` extra attempts.
    pub fn new(
        inner: Arc<dyn agrishield_core::Provider>,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

#[async_trait]
impl agrishield_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 1;

        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        info!(provider = %self.inner.name(), attempt, "Retry: provider recovered");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts() => {
                    let delay = self.backoff * attempt;
                    warn!(
                        provider = %self.inner.name(),
                        attempt,
                        total = self.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retry: provider failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrishield_core::message::Message;
    use std::sync::Mutex;

    /// Fails with the scripted errors in order, then succeeds.
    struct FlakyProvider {
        errors: Mutex<Vec<ProviderError>>,
        call_count: Mutex<usize>,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    impl FlakyProvider {
        fn new(errors: Vec<ProviderError>) -> Self {
            Self {
                errors: Mutex::new(errors),
                call_count: Mutex::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl agrishield_core::Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.seen.lock().unwrap().push(request);
            let mut errors = self.errors.lock().unwrap();
            if errors.is_empty() {
                Ok(ProviderResponse {
                    text: "recovered".into(),
                    usage: None,
                    model: "test-model".into(),
                    finish_reason: None,
                })
            } else {
                Err(errors.remove(0))
            }
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest {
            model: "test".into(),
            system_instruction: Some("policy".into()),
            messages: vec![Message::user("hello")],
            temperature: None,
            max_output_tokens: Some(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_with_identical_request() {
        let inner = Arc::new(FlakyProvider::new(vec![
            ProviderError::Network("reset".into()),
            ProviderError::ApiError {
                status_code: 503,
                message: "overloaded".into(),
            },
        ]));
        let retry = RetryProvider::new(inner.clone(), 2, Duration::from_millis(100));

        let result = retry.complete(test_request()).await.unwrap();
        assert_eq!(result.text, "recovered");
        assert_eq!(inner.calls(), 3);

        let seen = inner.seen.lock().unwrap();
        assert!(seen.iter().all(|r| r.messages == seen[0].messages));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(FlakyProvider::new(vec![
            ProviderError::RateLimited { retry_after_secs: 1 },
            ProviderError::RateLimited { retry_after_secs: 1 },
            ProviderError::RateLimited { retry_after_secs: 1 },
        ]));
        let retry = RetryProvider::new(inner.clone(), 1, Duration::from_millis(10));

        let err = retry.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let inner = Arc::new(FlakyProvider::new(vec![ProviderError::AuthenticationFailed(
            "bad key".into(),
        )]));
        let retry = RetryProvider::new(inner.clone(), 3, Duration::from_millis(10));

        let err = retry.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert_eq!(inner.calls(), 1);
    }

    #[test]
    fn attempts_and_name() {
        let inner = Arc::new(FlakyProvider::new(vec![]));
        let retry = RetryProvider::new(inner, 2, Duration::from_millis(10));
        assert_eq!(retry.max_attempts(), 3);
        assert_eq!(agrishield_core::Provider::name(&retry), "flaky");
    }
}
