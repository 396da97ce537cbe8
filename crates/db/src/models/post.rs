//! Post models and DTOs.
//!
//! Column names `gitbranch`, `githubpr`, and `leaderimageurl` are the
//! identifiers the publishing pipeline writes back once a branch has been
//! pushed and a pull request opened.

use inkwell_core::error::CoreError;
use inkwell_core::status::PostStatus;
use inkwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::image::Image;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A post row from the `posts` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub status: String,
    pub gitbranch: Option<String>,
    pub githubpr: Option<String>,
    pub leaderimageurl: Option<String>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    /// Parsed lifecycle status.
    pub fn status(&self) -> Result<PostStatus, CoreError> {
        PostStatus::from_name(&self.status)
    }

    /// The stored branch name, treating an empty string as absent.
    pub fn branch(&self) -> Option<&str> {
        self.gitbranch.as_deref().filter(|b| !b.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting a new post.
#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Input for updating an existing post (all fields optional).
///
/// The slug is deliberately not patchable: once a branch exists it names the
/// file inside that branch.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A post together with all of its image prompts.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithImages {
    #[serde(flatten)]
    pub post: Post,
    pub images: Vec<Image>,
}
