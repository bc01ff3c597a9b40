//! Bounded retry with a fixed delay between attempts.
//!
//! The delay is a `tokio` timer raced against a [`CancellationToken`], so
//! waiting never stalls the runtime and a caller can abandon the loop.
//!
//! # Example
//!
//! ```no_run
//! use eduhub_api::resilience::retry::{retry, ConstantBackoff};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = ConstantBackoff::new(3, Duration::from_secs(5));
//! let cancel = CancellationToken::new();
//!
//! let value = retry(&policy, &cancel, || async {
//!     Ok::<_, std::io::Error>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Decides whether and when another attempt is made.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next attempt, given how many attempts have already
    /// failed. `None` means give up.
    fn next_delay(&self, failed_attempts: usize) -> Option<Duration>;

    /// Total number of attempts, the first one included.
    fn max_attempts(&self) -> usize;
}

/// Fixed delay between at most `max_attempts` attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantBackoff {
    max_attempts: usize,
    delay: Duration,
}

impl ConstantBackoff {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl RetryPolicy for ConstantBackoff {
    fn next_delay(&self, failed_attempts: usize) -> Option<Duration> {
        if failed_attempts >= self.max_attempts {
            None
        } else {
            Some(self.delay)
        }
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

/// Why a retried operation did not produce a value.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure.
    Exhausted { error: E, attempts: usize },
    /// The token fired before an attempt succeeded.
    Cancelled { last_error: Option<E>, attempts: usize },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { error, attempts } => {
                write!(f, "Operation failed after {} attempts: {}", attempts, error)
            }
            RetryError::Cancelled { attempts, .. } => {
                write!(f, "Operation cancelled after {} attempts", attempts)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Runs `f` until it succeeds, the policy gives up, or `cancel` fires.
///
/// At least one attempt is always made unless the token is already
/// cancelled on entry.
pub async fn retry<F, Fut, T, E, P>(
    policy: &P,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: RetryPolicy + ?Sized,
{
    let mut attempts = 0;
    let mut last_error = None;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled {
                last_error,
                attempts,
            });
        }

        attempts += 1;
        debug!("Attempt {}/{}", attempts, policy.max_attempts());

        let error = match f().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!("Operation succeeded after {} attempts", attempts);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let Some(delay) = policy.next_delay(attempts) else {
            warn!("Giving up after {} attempts: {}", attempts, error);
            return Err(RetryError::Exhausted { error, attempts });
        };

        warn!(
            "Attempt {}/{} failed: {}; retrying in {:?}",
            attempts,
            policy.max_attempts(),
            error,
            delay
        );

        tokio::select! {
            _ = sleep(delay) => {}
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled {
                    last_error: Some(error),
                    attempts,
                });
            }
        }

        last_error = Some(error);
    }
}
