//! Retry policies for ledger calls.
//!
//! Reads are idempotent and retried with a fixed delay. State-changing
//! submissions are attempted once: a retried transaction could apply twice,
//! so a failure is logged and the job is picked up again on a later poll.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::job::JobId;

/// Bounded fixed-delay retry for read-only calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay between attempts in seconds.
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay_secs: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay between attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Run a read-only call until it succeeds or the policy runs out of
/// attempts, returning the last error.
pub async fn retry_read<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut call: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                error!(call = what, attempts, "Giving up: {e}");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    call = what,
                    attempt,
                    attempts,
                    "Call failed, retrying in {}s: {e}",
                    policy.delay_secs
                );
                tokio::time::sleep(policy.delay()).await;
                attempt += 1;
            }
        }
    }
}

/// Attempt a state-changing call once, logging failure.
pub async fn submit_logged<T, E, Fut>(what: &str, job: &JobId, call: Fut) -> Option<T>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    match call.await {
        Ok(value) => Some(value),
        Err(e) => {
            error!(call = what, job_id = %job, "Submission failed: {e}");
            None
        }
    }
}
