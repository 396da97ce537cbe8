//! Post lifecycle status values.
//!
//! ```text
//! drafting --publish--> publishing --PR opened--> pr_open
//!                            \
//!                             +--error--> failed --retry--> publishing
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state stored in `posts.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Drafting,
    Publishing,
    PrOpen,
    Failed,
}

impl PostStatus {
    /// Database value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::Publishing => "publishing",
            Self::PrOpen => "pr_open",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "drafting" => Ok(Self::Drafting),
            "publishing" => Ok(Self::Publishing),
            "pr_open" => Ok(Self::PrOpen),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown post status '{other}'"
            ))),
        }
    }

    /// Whether a first-time publish may be started from this state.
    pub fn can_start_publish(self) -> bool {
        matches!(self, Self::Drafting | Self::Failed)
    }
}
