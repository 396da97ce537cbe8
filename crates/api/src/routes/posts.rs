//! Route definitions for the `/posts` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{images, posts};
use crate::state::AppState;

/// Routes mounted at `/posts`. Every route requires authentication.
///
/// ```text
/// GET  /                           -> list_posts
/// POST /                           -> create_post
/// GET  /{id}                       -> get_post
/// PUT  /{id}                       -> update_post
/// POST /{id}/publish               -> publish_post
/// GET  /{id}/images                -> list_images
/// PUT  /{id}/images/{image_id}     -> upload_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route("/{id}", get(posts::get_post).put(posts::update_post))
        .route("/{id}/publish", post(posts::publish_post))
        .route("/{id}/images", get(images::list_images))
        .route("/{id}/images/{image_id}", put(images::upload_image))
}
