pub mod auth;
pub mod health;
pub mod posts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/login                          login (public)
///
/// /posts                               list, create
/// /posts/{id}                          get, update
/// /posts/{id}/publish                  start publish (POST)
/// /posts/{id}/images                   list images
/// /posts/{id}/images/{image_id}        upload image bytes (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/posts", posts::router())
}
