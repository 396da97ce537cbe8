//! In-process dispatch of publish and pull-request update runs.

use std::time::Duration;

use inkwell_core::types::DbId;
use inkwell_publisher::{PublishError, Publisher, UpdateOutcome};
use tokio_util::task::TaskTracker;

/// Spawns pipeline runs on the Tokio runtime and logs their outcome.
///
/// Failures are persisted on the post by the pipeline itself, so nothing is
/// reported back to the request that triggered the run. Spawned tasks are
/// tracked so shutdown can wait for in-flight pushes.
#[derive(Clone)]
pub struct PublishDispatcher {
    publisher: Publisher,
    tracker: TaskTracker,
}

impl PublishDispatcher {
    pub fn new(publisher: Publisher) -> Self {
        Self {
            publisher,
            tracker: TaskTracker::new(),
        }
    }

    /// Start a first-time publish of `post_id`.
    ///
    /// Refused once [`drain`](Self::drain) has closed the dispatcher.
    pub fn dispatch_publish(&self, post_id: DbId) {
        if self.refuse(post_id, "publish") {
            return;
        }
        let publisher = self.publisher.clone();
        tracing::debug!(post_id, "Dispatching publish");
        self.tracker.spawn(async move {
            match publisher.publish_post(post_id).await {
                Ok(published) => tracing::info!(
                    post_id,
                    branch = %published.branch,
                    pull_request = %published.pull_request_url,
                    "Background publish finished"
                ),
                Err(PublishError::AlreadyPublished(_)) => {
                    tracing::info!(post_id, "Post already claimed by another publish");
                }
                Err(e) => tracing::error!(post_id, error = %e, "Background publish failed"),
            }
        });
    }

    /// Push the post's current content to its open pull request branch.
    pub fn dispatch_update(&self, post_id: DbId) {
        if self.refuse(post_id, "update") {
            return;
        }
        let publisher = self.publisher.clone();
        tracing::debug!(post_id, "Dispatching pull request update");
        self.tracker.spawn(async move {
            match publisher.update_open_pr(post_id).await {
                Ok(UpdateOutcome::Skipped) => {
                    tracing::debug!(post_id, "No branch to update");
                }
                Ok(outcome) => tracing::info!(post_id, ?outcome, "Background update finished"),
                Err(e) => tracing::error!(post_id, error = %e, "Background update failed"),
            }
        });
    }

    fn refuse(&self, post_id: DbId, run: &'static str) -> bool {
        let closed = self.tracker.is_closed();
        if closed {
            tracing::warn!(post_id, run, "Dispatcher is shutting down, run not started");
        }
        closed
    }

    /// Number of runs still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting runs and wait for running ones, up to `timeout`.
    /// Returns `false` if tasks were still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(in_flight = self.in_flight(), "Publish tasks still running at shutdown");
        }
        drained
    }

    /// Wait until every task spawned so far has finished, then accept new
    /// tasks again. Dispatches made while waiting are refused.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
