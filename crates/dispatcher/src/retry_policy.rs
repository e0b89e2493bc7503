use std::future::Future;
use std::time::Duration;

use bulk_sender_core::{ChannelError, RetryConfig};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Explicit retry behavior applied around a single remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    retryable: fn(&ChannelError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Value produced by a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts: {error}")]
    Exhausted { attempts: u32, error: ChannelError },

    #[error("rejected on attempt {attempts}: {error}")]
    Rejected { attempts: u32, error: ChannelError },

    #[error("cancelled after {attempts} attempts")]
    Cancelled {
        attempts: u32,
        last_error: Option<ChannelError>,
    },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::Rejected { attempts, .. }
            | RetryError::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn last_error(&self) -> Option<&ChannelError> {
        match self {
            RetryError::Exhausted { error, .. } | RetryError::Rejected { error, .. } => Some(error),
            RetryError::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// True when no attempt reached the remote side.
    pub fn never_attempted(&self) -> bool {
        self.attempts() == 0
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            retryable: ChannelError::is_retryable,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.max_delay())
    }

    /// Replaces the predicate that decides which failures consume a retry.
    pub fn with_retryable(mut self, predicate: fn(&ChannelError) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    pub fn is_retryable(&self, error: &ChannelError) -> bool {
        (self.retryable)(error)
    }

    /// `min(base_delay * 2^attempts_used, max_delay)`
    pub fn backoff_delay(&self, attempts_used: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempts_used);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// runs out of attempts, or `cancel` fires.
    ///
    /// Cancellation is checked before every attempt and interrupts the
    /// backoff wait; an in-flight attempt is always awaited.
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<Attempted<T>, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ChannelError>>,
    {
        let mut attempts = 0;
        let mut last_error = None;

        loop {
            if cancel.is_cancelled() {
                debug!("{label}: cancelled before attempt {}", attempts + 1);
                return Err(RetryError::Cancelled {
                    attempts,
                    last_error,
                });
            }

            attempts += 1;
            let error = match operation(attempts).await {
                Ok(value) => return Ok(Attempted { value, attempts }),
                Err(error) => error,
            };

            if !self.is_retryable(&error) {
                warn!("{label}: attempt {attempts} rejected, not retrying: {error}");
                return Err(RetryError::Rejected { attempts, error });
            }

            if attempts >= self.max_attempts {
                warn!("{label}: attempt {attempts}/{} failed, giving up: {error}", self.max_attempts);
                return Err(RetryError::Exhausted { attempts, error });
            }

            let delay = self.backoff_delay(attempts);
            warn!(
                "{label}: attempt {attempts}/{} failed, retrying in {:?}: {error}",
                self.max_attempts, delay
            );
            last_error = Some(error);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("{label}: cancelled during backoff");
                    return Err(RetryError::Cancelled { attempts, last_error });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(3));
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(3));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_succeeds_after_retryable_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast_policy(3)
            .execute("test", &CancellationToken::new(), |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(ChannelError::from_status(503, None))
                    } else {
                        Ok("sent")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, "sent");
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<Attempted<()>, _> = fast_policy(3)
            .execute("test", &CancellationToken::new(), |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ChannelError::from_status(400, Some("bad payload".into())))
                }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Rejected { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let result: Result<Attempted<()>, _> = fast_policy(2)
            .execute("test", &CancellationToken::new(), |_| async {
                Err(ChannelError::Connectivity("connection refused".into()))
            })
            .await;

        let error = result.unwrap_err();
        assert!(matches!(error, RetryError::Exhausted { attempts: 2, .. }));
        assert!(!error.never_attempted());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Attempted<()>, _> = fast_policy(3)
            .execute("test", &cancel, |_| async { Ok(()) })
            .await;

        let error = result.unwrap_err();
        assert!(error.never_attempted());
        assert!(error.last_error().is_none());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let handle = tokio::spawn(async move {
            policy
                .execute("test", &cancel, |_| async {
                    Err::<(), _>(ChannelError::from_status(502, None))
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("backoff should be interrupted")
            .unwrap();
        match result {
            Err(RetryError::Cancelled {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 1);
                assert!(last_error.is_some());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let policy = fast_policy(3).with_retryable(|_| false);
        let result: Result<Attempted<()>, _> = policy
            .execute("test", &CancellationToken::new(), |_| async {
                Err(ChannelError::from_status(503, None))
            })
            .await;
        assert!(matches!(result, Err(RetryError::Rejected { .. })));
    }
}
