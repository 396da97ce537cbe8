//! Handlers for the `/posts` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use inkwell_core::error::CoreError;
use inkwell_core::image::{ImageAsset, ImageKind};
use inkwell_core::slug::{slugify_title, validate_title};
use inkwell_core::status::PostStatus;
use inkwell_core::types::DbId;
use inkwell_db::models::image::CreateImage;
use inkwell_db::models::post::{CreatePost, Post, PostWithImages, UpdatePost};
use inkwell_db::repositories::PostRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// One image prompt in a create request.
#[derive(Debug, Deserialize)]
pub struct ImagePromptInput {
    pub text: String,
}

/// Request body for `POST /posts`.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub leader_image_prompt: Option<ImagePromptInput>,
    /// Body image prompts; `{{image:N}}` in the content refers to the N-th.
    #[serde(default)]
    pub image_prompts: Vec<ImagePromptInput>,
}

impl CreatePostRequest {
    /// Image rows to insert. Blank prompts are skipped; the leader takes
    /// position 0 and body images are numbered from 1 in request order.
    fn image_inputs(&self) -> AppResult<Vec<CreateImage>> {
        let leader = self
            .leader_image_prompt
            .iter()
            .map(|p| (ImageKind::Leader, p.text.trim()));
        let body = self
            .image_prompts
            .iter()
            .map(|p| (ImageKind::Body, p.text.trim()));

        let mut inputs = Vec::new();
        let mut next_body_position = 1;
        for (kind, text) in leader.chain(body) {
            if text.is_empty() {
                continue;
            }
            // Rejects prompts that cannot name an image file.
            ImageAsset::from_prompt(text)?;
            let position = match kind {
                ImageKind::Leader => 0,
                ImageKind::Body => {
                    let p = next_body_position;
                    next_body_position += 1;
                    p
                }
            };
            inputs.push(CreateImage {
                kind,
                prompt_text: text.to_string(),
                position,
            });
        }
        Ok(inputs)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/posts
pub async fn list_posts(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Post>>>> {
    let posts = PostRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: posts }))
}

/// POST /api/v1/posts
///
/// Store the post with its image prompts, then start publishing it in the
/// background.
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PostWithImages>>)> {
    validate_title(&input.title)?;
    let images = input.image_inputs()?;

    let title = input.title.trim().to_string();
    let create = CreatePost {
        slug: slugify_title(&title),
        title,
        summary: input.summary,
        content: input.content,
    };
    let created = PostRepo::create_with_images(&state.pool, &create, &images).await?;

    tracing::info!(
        post_id = created.post.id,
        user_id = user.user_id,
        images = created.images.len(),
        "Created post"
    );
    state.dispatcher.dispatch_publish(created.post.id);

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PostWithImages>>> {
    let post = PostRepo::find_with_images(&state.pool, id)
        .await?
        .ok_or_else(|| post_not_found(id))?;
    Ok(Json(DataResponse { data: post }))
}

/// PUT /api/v1/posts/{id}
///
/// Patch the post and push the new content to its open pull request, if any.
pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePost>,
) -> AppResult<Json<DataResponse<Post>>> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }

    let post = PostRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| post_not_found(id))?;

    tracing::info!(post_id = id, user_id = user.user_id, "Updated post");
    // Edits made while a publish is running are picked up by that run.
    if post.githubpr.is_some() {
        state.dispatcher.dispatch_update(id);
    }

    Ok(Json(DataResponse { data: post }))
}

/// POST /api/v1/posts/{id}/publish
///
/// Start a publish for a post that has never been published or whose last
/// attempt failed before a pull request was opened. Returns 202.
pub async fn publish_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<Post>>)> {
    let post = PostRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| post_not_found(id))?;

    validate_title(&post.title)?;
    let status = post.status()?;
    let retryable = status == PostStatus::Failed && post.githubpr.is_none();
    if post.branch().is_some() && !retryable {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Post {id} is already {}",
            status.as_str()
        ))));
    }

    tracing::info!(post_id = id, user_id = user.user_id, "Publish requested");
    state.dispatcher.dispatch_publish(id);

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: post })))
}

pub(crate) fn post_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Post", id })
}
