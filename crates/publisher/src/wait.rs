//! Waiting for a freshly pushed branch to become visible through the API.
//!
//! A `git push` can succeed seconds before the hosting API reports the new
//! branch; opening a pull request in that window fails. [`wait_for_branch`]
//! polls with exponential backoff until the branch shows up or the attempt
//! budget is spent. Polling is read-only, so calling it repeatedly is safe.

use std::time::Duration;

use crate::error::PublishError;
use crate::host::GitHost;

/// Default number of visibility checks.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Delay after the first failed check; doubled after each further one.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Upper bound on a single delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);

/// Retry budget for [`wait_for_branch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl WaitPolicy {
    /// Delay to sleep after failed attempt number `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Poll until `branch` is visible on `host`.
///
/// Returns the number of attempts it took. Transient host errors count as
/// "not visible yet"; authorization and other API errors abort immediately.
pub async fn wait_for_branch(
    host: &dyn GitHost,
    branch: &str,
    policy: &WaitPolicy,
) -> Result<u32, PublishError> {
    let max_attempts = policy.max_attempts.max(1);
    tracing::debug!(branch, max_attempts, "Waiting for branch to become visible");

    for attempt in 1..=max_attempts {
        match host.branch_exists(branch).await {
            Ok(true) => {
                tracing::info!(branch, attempt, "Branch visible via API");
                return Ok(attempt);
            }
            Ok(false) => {
                tracing::debug!(branch, attempt, "Branch not visible yet");
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(branch, attempt, error = %e, "Branch check failed, will retry");
            }
            Err(e) => return Err(e.into()),
        }

        if attempt < max_attempts {
            let delay = policy.delay_after(attempt);
            tracing::debug!(branch, attempt, delay_ms = delay.as_millis() as u64, "Sleeping");
            tokio::time::sleep(delay).await;
        }
    }

    Err(PublishError::BranchTimeout {
        branch: branch.to_string(),
        attempts: max_attempts,
    })
}
