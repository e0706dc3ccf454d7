//! Retry with randomized exponential backoff and a per-attempt timeout.
//!
//! Only errors classified as transient by [`ProviderError::is_retryable`]
//! are retried. Rejections, authentication failures and client-side 4xx
//! errors surface on the first attempt.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reprompt_config::RetryConfig;
use reprompt_core::{Completion, CompletionProvider, CompletionRequest, ProviderError};
use tracing::warn;

/// How often and how patiently to retry a provider call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Full jitter: each delay is drawn uniformly from zero to its bound.
    pub jitter: bool,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Upper bound of the wait after failed attempt `attempt` (0-indexed).
    pub fn backoff_bound(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }

    /// The wait after failed attempt `attempt`, honouring a rate limit's
    /// `Retry-After` when it is longer than the backoff.
    pub fn delay_for_attempt(&self, attempt: u32, error: &ProviderError) -> Duration {
        let bound = self.backoff_bound(attempt);
        let delay = if self.jitter && !bound.is_zero() {
            Duration::from_secs_f64(rand::rng().random_range(0.0..=bound.as_secs_f64()))
        } else {
            bound
        };
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                delay.max(Duration::from_secs(*retry_after_secs).min(self.max_delay))
            }
            _ => delay,
        }
    }
}

/// Wraps a provider and retries transient failures according to a
/// [`RetryPolicy`].
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: CompletionProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let mut attempt = 0;
        loop {
            let call = self.inner.complete(request.clone());
            let outcome = match tokio::time::timeout(self.policy.attempt_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "{} did not answer within {}s",
                    self.inner.name(),
                    self.policy.attempt_timeout.as_secs()
                ))),
            };

            let error = match outcome {
                Ok(completion) => return Ok(completion),
                Err(e) => e,
            };

            attempt += 1;
            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(attempt - 1, &error);
            warn!(
                provider = %self.inner.name(),
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails with the scripted errors in order, then succeeds.
    struct FlakyProvider {
        failures: Mutex<Vec<ProviderError>>,
        call_count: Mutex<usize>,
    }

    impl FlakyProvider {
        fn new(mut failures: Vec<ProviderError>) -> Self {
            failures.reverse();
            Self {
                failures: Mutex::new(failures),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-model"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            if let Some(error) = self.failures.lock().unwrap().pop() {
                return Err(error);
            }
            Ok(Completion {
                text: format!("echo: {}", request.prompt),
                input_tokens: 3,
                output_tokens: 2,
                model: "flaky-model".into(),
            })
        }
    }

    /// A provider that hangs forever (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl CompletionProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        fn model(&self) -> &str {
            "hanging-model"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Network("unreachable".into()))
        }
    }

    fn server_error() -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        }
    }

    #[test]
    fn policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(300));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_bound(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_bound(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_bound(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_bound(3), Duration::from_secs(5));
        assert_eq!(policy.backoff_bound(40), Duration::from_secs(5));
    }

    #[test]
    fn jittered_delay_stays_within_bound() {
        let policy = RetryPolicy::default();
        for attempt in 0..6 {
            let delay = policy.delay_for_attempt(attempt, &server_error());
            assert!(delay <= policy.backoff_bound(attempt));
        }
    }

    #[test]
    fn rate_limit_waits_at_least_retry_after() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };
        let error = ProviderError::RateLimited {
            retry_after_secs: 7,
        };
        assert_eq!(policy.delay_for_attempt(0, &error), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_then_succeeds() {
        let provider = RetryingProvider::new(
            FlakyProvider::new(vec![server_error(), ProviderError::Network("reset".into())]),
            RetryPolicy::default(),
        );
        let completion = provider
            .complete(CompletionRequest::new("hi", 8))
            .await
            .unwrap();
        assert_eq!(completion.text, "echo: hi");
        assert_eq!(provider.inner().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let provider = RetryingProvider::new(
            FlakyProvider::new(vec![server_error(), server_error(), server_error(), server_error()]),
            RetryPolicy::default(),
        );
        let err = provider
            .complete(CompletionRequest::new("hi", 8))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 503, .. }));
        assert_eq!(provider.inner().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_not_retried() {
        let provider = RetryingProvider::new(
            FlakyProvider::new(vec![ProviderError::Rejected("policy".into())]),
            RetryPolicy::default(),
        );
        let err = provider
            .complete(CompletionRequest::new("hi", 8))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(provider.inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_attempts_time_out() {
        let policy = RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        let provider = RetryingProvider::new(HangingProvider, policy);
        let err = provider
            .complete(CompletionRequest::new("hi", 8))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn no_retry_policy_fails_fast() {
        let provider = RetryingProvider::new(
            FlakyProvider::new(vec![server_error()]),
            RetryPolicy::no_retry(),
        );
        assert!(provider.complete(CompletionRequest::new("hi", 8)).await.is_err());
        assert_eq!(provider.inner().calls(), 1);
    }
}
