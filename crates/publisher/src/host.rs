//! The Git hosting API seam.
//!
//! The pipeline needs exactly two remote operations: checking whether a
//! branch is visible, and opening a pull request. Keeping them behind a trait
//! lets tests substitute a host that inspects a local bare repository.

use async_trait::async_trait;
use serde::Serialize;

/// Errors from the hosting API, classified by whether retrying can help.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// The repository or resource does not exist (or the token cannot see it).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad or missing credentials. Never retried.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Server errors, rate limiting, and network failures.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Any other API error (validation failures, unexpected responses).
    #[error("API error: {0}")]
    Api(String),
}

impl HostError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Parameters of a pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    /// Branch with the changes.
    pub head: String,
    /// Branch the changes should be merged into.
    pub base: String,
    pub body: String,
}

/// Identifiers of an opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub html_url: String,
}

#[async_trait]
pub trait GitHost: Send + Sync {
    /// Whether `branch` is visible through the API. A missing branch is
    /// `Ok(false)`, not an error.
    async fn branch_exists(&self, branch: &str) -> Result<bool, HostError>;

    async fn create_pull_request(&self, pr: &NewPullRequest)
        -> Result<PullRequestRef, HostError>;
}
