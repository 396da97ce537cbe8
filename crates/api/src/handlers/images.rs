//! Handlers for a post's generated images.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use inkwell_core::error::CoreError;
use inkwell_core::image::ImageKind;
use inkwell_core::types::DbId;
use inkwell_db::models::image::Image;
use inkwell_db::repositories::{ImageRepo, PostRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::posts::post_not_found;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/posts/{id}/images
pub async fn list_images(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(post_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Image>>>> {
    if PostRepo::find_by_id(&state.pool, post_id).await?.is_none() {
        return Err(post_not_found(post_id));
    }
    let images = ImageRepo::list_by_post(&state.pool, post_id).await?;
    Ok(Json(DataResponse { data: images }))
}

/// PUT /api/v1/posts/{id}/images/{image_id}
///
/// Store generated image bytes (the raw request body) under the key derived
/// from the prompt and record the public URL. Uploading the leader image
/// also sets the post's `leaderimageurl`. If the post already has an open
/// pull request, the branch is re-rendered to include the image.
pub async fn upload_image(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((post_id, image_id)): Path<(DbId, DbId)>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<DataResponse<Image>>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("image/"))
        .ok_or_else(|| AppError::BadRequest("Content-Type must be an image type".into()))?
        .to_string();
    if body.is_empty() {
        return Err(AppError::BadRequest("Image body must not be empty".into()));
    }

    let image = ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .filter(|image| image.post_id == post_id)
        .ok_or_else(|| image_not_found(image_id))?;

    let asset = image.asset()?;
    let size = body.len();
    let url = state
        .store
        .put(asset.object_key(), body.to_vec(), &content_type)
        .await?;

    let image = ImageRepo::set_image_url(&state.pool, image_id, &url)
        .await?
        .ok_or_else(|| image_not_found(image_id))?;
    if image.kind()? == ImageKind::Leader {
        PostRepo::set_leader_image_url(&state.pool, post_id, &url).await?;
    }

    tracing::info!(post_id, image_id, key = asset.object_key(), size, "Stored image");

    let post = PostRepo::find_by_id(&state.pool, post_id)
        .await?
        .ok_or_else(|| post_not_found(post_id))?;
    // Before the pull request exists the running publish picks the image up.
    if post.githubpr.is_some() {
        state.dispatcher.dispatch_update(post_id);
    }

    Ok(Json(DataResponse { data: image }))
}

fn image_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Image",
        id,
    })
}
