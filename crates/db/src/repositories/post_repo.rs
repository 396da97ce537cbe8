//! Repository for the `posts` table.

use inkwell_core::status::PostStatus;
use inkwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::{CreateImage, Image};
use crate::models::post::{CreatePost, Post, PostWithImages, UpdatePost};
use crate::repositories::image_repo::{self, ImageRepo};

/// Column list for posts queries.
const COLUMNS: &str = "id, title, slug, summary, content, status, gitbranch, githubpr, \
    leaderimageurl, last_error, created_at, updated_at";

/// Provides CRUD and pipeline write-back operations for posts.
pub struct PostRepo;

impl PostRepo {
    /// Insert a post and its image prompts in one transaction.
    ///
    /// The post starts in the `drafting` status.
    pub async fn create_with_images(
        pool: &PgPool,
        input: &CreatePost,
        images: &[CreateImage],
    ) -> Result<PostWithImages, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO posts (title, slug, summary, content, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.summary)
            .bind(&input.content)
            .bind(PostStatus::Drafting.as_str())
            .fetch_one(&mut *tx)
            .await?;

        let insert_image = format!(
            "INSERT INTO images (post_id, kind, prompt_text, position)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            image_repo::COLUMNS
        );
        let mut created = Vec::with_capacity(images.len());
        for image in images {
            let row = sqlx::query_as::<_, Image>(&insert_image)
                .bind(post.id)
                .bind(image.kind.as_str())
                .bind(&image.prompt_text)
                .bind(image.position)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;

        Ok(PostWithImages {
            post,
            images: created,
        })
    }

    /// Find a post by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Post>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM posts WHERE id = $1");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a post and load its images.
    pub async fn find_with_images(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PostWithImages>, sqlx::Error> {
        let Some(post) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let images = ImageRepo::list_by_post(pool, id).await?;
        Ok(Some(PostWithImages { post, images }))
    }

    /// List all posts, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Post>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM posts ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Post>(&query).fetch_all(pool).await
    }

    /// Patch a post. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePost,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query = format!(
            "UPDATE posts SET
                title = COALESCE($1, title),
                summary = COALESCE($2, summary),
                content = COALESCE($3, content)
             WHERE id = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(&input.title)
            .bind(&input.summary)
            .bind(&input.content)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the branch and slug for a post that is about to be published and
    /// move it to `publishing`.
    ///
    /// Only succeeds when the post has no branch yet, or when a previous
    /// attempt failed before a pull request was opened. Returns `None` when
    /// the post does not exist or is not eligible, so two concurrent publish
    /// attempts cannot both claim the post.
    pub async fn set_branch(
        pool: &PgPool,
        id: DbId,
        branch: &str,
        slug: &str,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query = format!(
            "UPDATE posts SET
                gitbranch = $2,
                slug = $3,
                status = $4,
                last_error = NULL
             WHERE id = $1
               AND (gitbranch IS NULL
                    OR gitbranch = ''
                    OR (status = $5 AND githubpr IS NULL))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(branch)
            .bind(slug)
            .bind(PostStatus::Publishing.as_str())
            .bind(PostStatus::Failed.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Associate the opened pull request with the post and mark it `pr_open`.
    pub async fn set_pull_request(
        pool: &PgPool,
        id: DbId,
        pull_request_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET githubpr = $2, status = $3, last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(pull_request_url)
        .bind(PostStatus::PrOpen.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the lifecycle status, replacing `last_error`.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: PostStatus,
        last_error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE posts SET status = $2, last_error = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(last_error)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failure message without touching the status.
    pub async fn set_last_error(
        pool: &PgPool,
        id: DbId,
        last_error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE posts SET last_error = $2 WHERE id = $1")
            .bind(id)
            .bind(last_error)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the public URL of the post's leader image.
    pub async fn set_leader_image_url(
        pool: &PgPool,
        id: DbId,
        url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE posts SET leaderimageurl = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
