use std::sync::Arc;

use inkwell_storage::ImageStore;

use crate::background::publish::PublishDispatcher;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: inkwell_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Object storage for generated images.
    pub store: Arc<dyn ImageStore>,
    /// Background runner for the publishing pipeline.
    pub dispatcher: PublishDispatcher,
}
