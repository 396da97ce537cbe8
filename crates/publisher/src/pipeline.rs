//! Sequencing of the publish and update flows.

use std::sync::Arc;

use chrono::Utc;
use inkwell_core::image::{ImageAsset, ImageKind};
use inkwell_core::render::{post_file_path, render_post, PostDocument};
use inkwell_core::slug::{branch_name, slugify_title, validate_title};
use inkwell_core::status::PostStatus;
use inkwell_core::types::DbId;
use inkwell_db::models::image::Image;
use inkwell_db::models::post::{Post, PostWithImages};
use inkwell_db::repositories::PostRepo;
use inkwell_storage::ImageStore;
use serde::Serialize;
use sqlx::PgPool;

use crate::config::PublisherConfig;
use crate::error::PublishError;
use crate::git::{GitError, GitWorkspace};
use crate::host::{GitHost, NewPullRequest};
use crate::wait::wait_for_branch;

/// Result of a successful first-time publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPost {
    pub post_id: DbId,
    pub slug: String,
    pub branch: String,
    pub pull_request_url: String,
    pub pull_request_number: u64,
}

/// Result of pushing edits to an already opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The post has no open pull request; nothing to update.
    Skipped,
    /// The rendered files match the branch tip.
    Unchanged { branch: String },
    /// A new commit was pushed.
    Pushed { branch: String, commit: String },
}

/// The parts of a post that end up in the rendered files.
#[derive(Debug, PartialEq, Eq)]
struct RenderInputs<'a> {
    title: &'a str,
    summary: &'a str,
    content: &'a str,
    uploads: Vec<(DbId, Option<&'a str>)>,
}

impl<'a> RenderInputs<'a> {
    fn of(post: &'a Post, images: &'a [Image]) -> Self {
        Self {
            title: &post.title,
            summary: &post.summary,
            content: &post.content,
            uploads: images
                .iter()
                .map(|image| (image.id, image.image_url.as_deref()))
                .collect(),
        }
    }
}

/// A file to write into the working tree.
#[derive(Debug, Clone)]
struct RepoFile {
    path: String,
    contents: Vec<u8>,
}

/// Drives posts from the database into branches and pull requests.
#[derive(Clone)]
pub struct Publisher {
    pool: PgPool,
    host: Arc<dyn GitHost>,
    store: Arc<dyn ImageStore>,
    config: Arc<PublisherConfig>,
}

impl Publisher {
    pub fn new(
        pool: PgPool,
        host: Arc<dyn GitHost>,
        store: Arc<dyn ImageStore>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            pool,
            host,
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publish a post for the first time: branch, commit, push, PR.
    ///
    /// Once the branch has been claimed, any failure marks the post `failed`
    /// with the error message before it is returned.
    pub async fn publish_post(&self, post_id: DbId) -> Result<PublishedPost, PublishError> {
        let PostWithImages { post, images } = PostRepo::find_with_images(&self.pool, post_id)
            .await?
            .ok_or(PublishError::NotFound(post_id))?;

        validate_title(&post.title)?;
        if !post.status()?.can_start_publish() {
            return Err(PublishError::AlreadyPublished(post_id));
        }

        let slug = slugify_title(&post.title);
        let branch = branch_name(
            &self.config.branch_prefix,
            &slug,
            Utc::now().timestamp_millis(),
        );

        let post = PostRepo::set_branch(&self.pool, post_id, &branch, &slug)
            .await?
            .ok_or(PublishError::AlreadyPublished(post_id))?;

        tracing::info!(post_id, branch = %branch, slug = %slug, "Publishing post");

        match self.publish_claimed(&post, &images, &slug, &branch).await {
            Ok(published) => {
                if let Err(e) = self.push_late_changes(&post, &images, &branch).await {
                    tracing::error!(post_id, branch = %branch, error = %e, "Follow-up update failed");
                    self.record_last_error(post_id, &e).await;
                }
                Ok(published)
            }
            Err(e) => {
                tracing::error!(post_id, branch = %branch, error = %e, "Publish failed");
                let message = e.to_string();
                if let Err(db_err) =
                    PostRepo::set_status(&self.pool, post_id, PostStatus::Failed, Some(&message))
                        .await
                {
                    tracing::error!(post_id, error = %db_err, "Failed to record publish failure");
                }
                Err(e)
            }
        }
    }

    async fn publish_claimed(
        &self,
        post: &Post,
        images: &[Image],
        slug: &str,
        branch: &str,
    ) -> Result<PublishedPost, PublishError> {
        let files = self.render_files(post, images, slug).await?;
        let message = format!("Add blog post: {}", post.title);

        let remote = self.config.remote_url.clone();
        let token = self.config.git_token.clone();
        let base = self.config.base_branch.clone();
        let author = self.config.commit_author.clone();
        let branch_owned = branch.to_string();
        let commit = tokio::task::spawn_blocking(move || -> Result<_, GitError> {
            let ws = GitWorkspace::clone_new_branch(&remote, token.as_deref(), &base, &branch_owned)?;
            write_files(&ws, &files)?;
            let commit = ws.commit_all(&message, &author)?;
            ws.push(&branch_owned)?;
            Ok(commit)
        })
        .await
        .map_err(|e| PublishError::Task(e.to_string()))??;

        tracing::info!(
            post_id = post.id,
            branch,
            commit = ?commit.map(|c| c.to_string()),
            "Branch pushed"
        );

        wait_for_branch(self.host.as_ref(), branch, &self.config.wait).await?;

        let pr = self
            .host
            .create_pull_request(&NewPullRequest {
                title: format!("Add blog post: {}", post.title),
                head: branch.to_string(),
                base: self.config.base_branch.clone(),
                body: self.config.pull_request_body.clone(),
            })
            .await?;

        PostRepo::set_pull_request(&self.pool, post.id, &pr.html_url).await?;
        tracing::info!(post_id = post.id, url = %pr.html_url, "Post published");

        Ok(PublishedPost {
            post_id: post.id,
            slug: slug.to_string(),
            branch: branch.to_string(),
            pull_request_url: pr.html_url,
            pull_request_number: pr.number,
        })
    }

    /// Edits and uploads that land while a publish is running never
    /// dispatch an update of their own, since the post has no pull request
    /// yet. Once the pull request is recorded, reload the post and push
    /// whatever changed since it was claimed.
    async fn push_late_changes(
        &self,
        claimed: &Post,
        claimed_images: &[Image],
        branch: &str,
    ) -> Result<Option<UpdateOutcome>, PublishError> {
        let PostWithImages { post, images } = PostRepo::find_with_images(&self.pool, claimed.id)
            .await?
            .ok_or(PublishError::NotFound(claimed.id))?;

        if RenderInputs::of(&post, &images) == RenderInputs::of(claimed, claimed_images) {
            return Ok(None);
        }

        tracing::info!(post_id = post.id, branch, "Post changed while publishing, updating branch");
        self.update_branch(&post, &images, branch).await.map(Some)
    }

    /// Re-render a post onto its existing branch so the open pull request
    /// reflects the latest edits.
    ///
    /// Only posts with an open pull request are updated; a failed publish
    /// keeps its branch and error untouched. Failures are recorded in
    /// `last_error`; the status is left as is.
    pub async fn update_open_pr(&self, post_id: DbId) -> Result<UpdateOutcome, PublishError> {
        let PostWithImages { post, images } = PostRepo::find_with_images(&self.pool, post_id)
            .await?
            .ok_or(PublishError::NotFound(post_id))?;

        let branch = match (post.branch(), post.githubpr.as_deref()) {
            (Some(branch), Some(_)) => branch.to_string(),
            _ => {
                tracing::info!(post_id, status = %post.status, "Post has no pull request, skipping update");
                return Ok(UpdateOutcome::Skipped);
            }
        };

        match self.update_branch(&post, &images, &branch).await {
            Ok(outcome) => {
                if post.last_error.is_some() {
                    PostRepo::set_last_error(&self.pool, post_id, None).await?;
                }
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(post_id, branch = %branch, error = %e, "Update failed");
                self.record_last_error(post_id, &e).await;
                Err(e)
            }
        }
    }

    async fn record_last_error(&self, post_id: DbId, error: &PublishError) {
        let message = error.to_string();
        if let Err(db_err) = PostRepo::set_last_error(&self.pool, post_id, Some(&message)).await {
            tracing::error!(post_id, error = %db_err, "Failed to record update failure");
        }
    }

    async fn update_branch(
        &self,
        post: &Post,
        images: &[Image],
        branch: &str,
    ) -> Result<UpdateOutcome, PublishError> {
        wait_for_branch(self.host.as_ref(), branch, &self.config.wait).await?;

        let files = self.render_files(post, images, &post.slug).await?;
        let message = format!("Update blog post: {}", post.title);

        let remote = self.config.remote_url.clone();
        let token = self.config.git_token.clone();
        let author = self.config.commit_author.clone();
        let branch_owned = branch.to_string();
        let commit = tokio::task::spawn_blocking(move || -> Result<_, GitError> {
            let ws = GitWorkspace::clone_existing_branch(&remote, token.as_deref(), &branch_owned)?;
            write_files(&ws, &files)?;
            let commit = ws.commit_all(&message, &author)?;
            if commit.is_some() {
                ws.push(&branch_owned)?;
            }
            Ok(commit)
        })
        .await
        .map_err(|e| PublishError::Task(e.to_string()))??;

        let outcome = match commit {
            Some(oid) => {
                tracing::info!(post_id = post.id, branch, commit = %oid, "Pushed post update");
                UpdateOutcome::Pushed {
                    branch: branch.to_string(),
                    commit: oid.to_string(),
                }
            }
            None => {
                tracing::info!(post_id = post.id, branch, "Post unchanged on branch");
                UpdateOutcome::Unchanged {
                    branch: branch.to_string(),
                }
            }
        };
        Ok(outcome)
    }

    /// Download uploaded images and render the post file.
    ///
    /// Images without an uploaded object are left out of both the commit and
    /// the rendered imports. A pending body image still holds its slot, so
    /// `{{image:N}}` keeps pointing at the N-th body prompt.
    async fn render_files(
        &self,
        post: &Post,
        images: &[Image],
        slug: &str,
    ) -> Result<Vec<RepoFile>, PublishError> {
        let mut files = Vec::with_capacity(images.len() + 1);
        let mut leader_image: Option<ImageAsset> = None;
        let mut body_images = Vec::new();

        for image in images {
            let kind = image.kind()?;
            let asset = if image.is_uploaded() {
                let asset = image.asset()?;
                let contents = self.store.get(asset.object_key()).await?;
                files.push(RepoFile {
                    path: asset.repo_path(),
                    contents,
                });
                Some(asset)
            } else {
                tracing::debug!(post_id = post.id, image_id = image.id, "Image not uploaded yet");
                None
            };
            match kind {
                ImageKind::Leader => leader_image = asset,
                ImageKind::Body => body_images.push(asset),
            }
        }

        let doc = PostDocument {
            title: &post.title,
            summary: &post.summary,
            content: &post.content,
            author: &self.config.post_author,
            date: post.created_at.date_naive(),
            leader_image,
            body_images,
        };
        files.push(RepoFile {
            path: post_file_path(slug),
            contents: render_post(&doc).into_bytes(),
        });

        Ok(files)
    }
}

fn write_files(ws: &GitWorkspace, files: &[RepoFile]) -> Result<(), GitError> {
    for file in files {
        ws.write_file(&file.path, &file.contents)?;
    }
    Ok(())
}
