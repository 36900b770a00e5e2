//! Bounded retry loop shared by connectivity recovery, page navigation and
//! pagination.
//!
//! Every caller retries the same way (attempt, recover, attempt again) but
//! reacts differently once the attempts run out. That reaction is the
//! [`ExhaustionPolicy`].

use std::fmt::Display;
use log::{error, warn};
use crate::error::ScrapeError;

/// What to do once every attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Log and carry on with whatever state the last attempt left behind.
    Degrade,
    /// Report that the caller should stop its current loop.
    Terminate,
    /// Fail with a fatal [`ScrapeError::Exhausted`].
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded(T),
    Degraded,
    Terminated,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub on_exhaustion: ExhaustionPolicy,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, on_exhaustion: ExhaustionPolicy) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            on_exhaustion,
        }
    }

    /// Runs `attempt` up to `max_attempts` times against `state`.
    ///
    /// `recover` runs between two attempts, never after the last one, so on
    /// exhaustion `state` is exactly what the final attempt left. An error
    /// from `recover` is returned immediately.
    pub fn run<S, T, E, A, R>(
        &self,
        operation: &str,
        state: &mut S,
        mut attempt: A,
        mut recover: R,
    ) -> Result<RetryOutcome<T>, ScrapeError>
    where
        E: Display,
        A: FnMut(&mut S) -> Result<T, E>,
        R: FnMut(&mut S) -> Result<(), ScrapeError>,
    {
        let mut last_error = String::new();

        for n in 1..=self.max_attempts {
            match attempt(state) {
                Ok(value) => return Ok(RetryOutcome::Succeeded(value)),
                Err(e) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        operation, n, self.max_attempts, e
                    );
                    last_error = e.to_string();
                }
            }

            if n < self.max_attempts {
                recover(state)?;
            }
        }

        match self.on_exhaustion {
            ExhaustionPolicy::Degrade => {
                error!("{} failed after {} attempts.", operation, self.max_attempts);
                Ok(RetryOutcome::Degraded)
            }
            ExhaustionPolicy::Terminate => Ok(RetryOutcome::Terminated),
            ExhaustionPolicy::Abort => Err(ScrapeError::Exhausted {
                operation: operation.to_string(),
                attempts: self.max_attempts,
                last: last_error,
            }),
        }
    }
}
