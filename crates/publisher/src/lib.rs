//! The post-publication pipeline.
//!
//! Turns a drafted post into a commit on a uniquely named branch of the site
//! repository and a pull request against its base branch, then writes the
//! branch and PR identifiers back onto the post.
//!
//! - [`git`] -- ephemeral clone / commit / push via libgit2.
//! - [`host`] -- the Git hosting API seam ([`host::GitHost`]).
//! - [`github`] -- [`host::GitHost`] implemented with octocrab.
//! - [`wait`] -- polling for branch visibility after a push.
//! - [`pipeline`] -- [`pipeline::Publisher`], which sequences all of the above.

pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod host;
pub mod pipeline;
pub mod wait;

pub use config::{CommitAuthor, GitHubConfig, PublisherConfig};
pub use error::PublishError;
pub use pipeline::{PublishedPost, Publisher, UpdateOutcome};
