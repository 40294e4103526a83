//! Bounded retries for the writes a job cannot afford to lose.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::store::StoreError;

use super::MANAGER_TARGET;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Attempt count and linear backoff applied to critical store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy making at most `attempts` attempts (at least one),
    /// sleeping `backoff * n` after the `n`th failure.
    #[must_use]
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Runs `operation` until it succeeds or the attempts are exhausted.
    ///
    /// Errors that are not [transient](StoreError::is_transient) end the run
    /// immediately. Returns the last error together with the number of attempts made.
    pub(crate) fn run(
        &self,
        label: &str,
        mut operation: impl FnMut() -> Result<(), StoreError>,
    ) -> Result<(), (StoreError, u32)> {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(()) => return Ok(()),
                Err(error) if !error.is_transient() || attempt >= self.attempts => {
                    return Err((error, attempt));
                }
                Err(error) => {
                    warn!(
                        target: MANAGER_TARGET,
                        operation = label,
                        attempt,
                        %error,
                        "store write failed; retrying"
                    );
                    thread::sleep(self.backoff.saturating_mul(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_BACKOFF)
    }
}
