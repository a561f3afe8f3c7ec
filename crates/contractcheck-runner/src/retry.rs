//! Bounded exponential backoff that stops as soon as a run is cancelled

use std::future::Future;
use std::time::Duration;

use contractcheck_core::RetrySettings;
use tracing::{debug, instrument};

use crate::cancel::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Run `op` until `accept` approves its output.
///
/// `op` receives the 1-based attempt number. Cancellation interrupts both a
/// running attempt and the backoff sleep.
///
/// # Errors
///
/// `Exhausted` when every attempt was rejected, `Cancelled` when `token`
/// fired first.
#[instrument(skip_all, fields(max_attempts = policy.max_attempts))]
pub async fn retry<T, F, Fut, A>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut op: F,
    accept: A,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    A: Fn(&T) -> bool,
{
    for attempt in 1..=policy.max_attempts {
        if token.is_cancelled() {
            return Err(RetryError::Cancelled {
                attempts: attempt - 1,
            });
        }
        let value = tokio::select! {
            biased;
            () = token.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
            value = op(attempt) => value,
        };
        if accept(&value) {
            return Ok(value);
        }
        if attempt < policy.max_attempts {
            let delay = policy.delay_for(attempt);
            debug!(attempt, ?delay, "attempt rejected, backing off");
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
    Err(RetryError::Exhausted {
        attempts: policy.max_attempts,
    })
}
