//! Bounded retry with a fixed, cancellable backoff.

use std::fmt::Display;
use std::time::Duration;

use crate::cancel::CancelToken;

/// Retry policy: at most `max_attempts` tries with a fixed `delay` between
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// A value produced by a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    /// Number of failed attempts before the successful one.
    pub retries: u32,
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure.
    Exhausted { attempts: u32, last: E },
    /// The token was cancelled; carries the attempts made so far.
    Cancelled { attempts: u32 },
}

impl RetryPolicy {
    /// Create a policy. An attempt cap of zero is raised to one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, the attempt cap is reached, or `cancel`
    /// fires.
    ///
    /// `op` receives the one-based attempt number. `is_cancelled` classifies
    /// failures that merely report cancellation; those stop the loop without
    /// counting as exhaustion.
    pub fn run<T, E, F, C>(
        &self,
        cancel: &CancelToken,
        is_cancelled: C,
        mut op: F,
    ) -> Result<Retried<T>, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        C: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            match op(attempt) {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        retries: attempt - 1,
                    })
                }
                Err(e) if is_cancelled(&e) => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay
                    );
                    if !cancel.sleep(self.delay) {
                        return Err(RetryError::Cancelled { attempts: attempt });
                    }
                }
            }
        }
    }
}
