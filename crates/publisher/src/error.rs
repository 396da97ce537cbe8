use inkwell_core::error::CoreError;
use inkwell_core::types::DbId;
use inkwell_storage::StorageError;

use crate::git::GitError;
use crate::host::HostError;

/// Errors raised by the publishing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Git host error: {0}")]
    Host(#[from] HostError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Branch '{branch}' not visible after {attempts} attempts")]
    BranchTimeout { branch: String, attempts: u32 },

    #[error("Post {0} already has a branch and cannot be published again")]
    AlreadyPublished(DbId),

    #[error("Post {0} not found")]
    NotFound(DbId),

    #[error("Background git task failed: {0}")]
    Task(String),
}
