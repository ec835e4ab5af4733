use log::{debug, warn};
use std::time::Duration;

use crate::cas::Retryable;

/// Suspends the workflow. Swapped for a recording fake in tests.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Result of one attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    Ready(T),
    Pending,
}

#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Ready { value: T, attempt: u32 },
    /// Every attempt ran without a ready value. `last_error` is the most recent tolerated error.
    Exhausted { attempts: u32, last_error: Option<E> },
    Aborted { attempt: u32, error: E },
}

/// Fixed-count, fixed-interval retry policy. Sleeps `interval` before every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    pub fn run<T, E, F>(&self, clock: &dyn Clock, mut op: F) -> RetryOutcome<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<Poll<T>, E>,
    {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            clock.sleep(self.interval);
            debug!("[retry] attempt {}/{}", attempt, self.max_attempts);
            match op(attempt) {
                Ok(Poll::Ready(value)) => return RetryOutcome::Ready { value, attempt },
                Ok(Poll::Pending) => {}
                Err(error) if error.is_retryable() => {
                    warn!(
                        "[retry] attempt {}/{} failed, continuing: {}",
                        attempt, self.max_attempts, error
                    );
                    last_error = Some(error);
                }
                Err(error) => {
                    warn!("[retry] attempt {} failed fatally: {}", attempt, error);
                    return RetryOutcome::Aborted { attempt, error };
                }
            }
        }
        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
