//! Bounded retry for store I/O.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FairDrawError, Result};

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 50;

/// How often, and how patiently, a failed store operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly after that
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// The last failure is returned as `FairDrawError::Persistence` naming the operation.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts && self.backoff_ms > 0 {
                        std::thread::sleep(Duration::from_millis(self.backoff_ms * attempt as u64));
                    }
                }
            }
        }

        let detail = last_error.map(|e| e.to_string()).unwrap_or_default();
        Err(FairDrawError::Persistence(format!(
            "{} failed after {} attempts: {}",
            what, attempts, detail
        )))
    }
}
