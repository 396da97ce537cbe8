//! Repository for the `images` table.

use inkwell_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::{CreateImage, Image};

/// Column list for images queries.
pub(crate) const COLUMNS: &str =
    "id, post_id, kind, prompt_text, image_url, position, created_at, updated_at";

/// Provides CRUD operations for image prompts.
pub struct ImageRepo;

impl ImageRepo {
    /// Insert an image prompt for a post.
    pub async fn create(
        pool: &PgPool,
        post_id: DbId,
        input: &CreateImage,
    ) -> Result<Image, sqlx::Error> {
        let query = format!(
            "INSERT INTO images (post_id, kind, prompt_text, position)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(post_id)
            .bind(input.kind.as_str())
            .bind(&input.prompt_text)
            .bind(input.position)
            .fetch_one(pool)
            .await
    }

    /// Find an image by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a post's images: leader first, then body images by position.
    pub async fn list_by_post(pool: &PgPool, post_id: DbId) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images
             WHERE post_id = $1
             ORDER BY (kind = 'leader') DESC, position ASC, id ASC"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(post_id)
            .fetch_all(pool)
            .await
    }

    /// Record the storage URL of an uploaded image.
    pub async fn set_image_url(
        pool: &PgPool,
        id: DbId,
        url: &str,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET image_url = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(pool)
            .await
    }
}
