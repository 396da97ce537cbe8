//! Image prompt models and DTOs.

use inkwell_core::error::CoreError;
use inkwell_core::image::{ImageAsset, ImageKind};
use inkwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An image row from the `images` table.
///
/// `image_url` stays `NULL` until generated bytes have been uploaded.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Image {
    pub id: DbId,
    pub post_id: DbId,
    pub kind: String,
    pub prompt_text: String,
    pub image_url: Option<String>,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Image {
    pub fn kind(&self) -> Result<ImageKind, CoreError> {
        ImageKind::from_name(&self.kind)
    }

    /// Naming derived from the prompt text.
    pub fn asset(&self) -> Result<ImageAsset, CoreError> {
        ImageAsset::from_prompt(&self.prompt_text)
    }

    pub fn is_uploaded(&self) -> bool {
        self.image_url.is_some()
    }
}

/// Input for inserting an image prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImage {
    pub kind: ImageKind,
    pub prompt_text: String,
    pub position: i32,
}
