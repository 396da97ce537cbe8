//! First-run creation of the admin account.

use inkwell_core::error::CoreError;
use inkwell_db::models::user::{CreateUser, User};
use inkwell_db::repositories::UserRepo;
use sqlx::PgPool;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};

/// Create the admin account if the `users` table is empty.
///
/// Returns the created user, or `None` when users already exist.
pub async fn ensure_admin_user(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> AppResult<Option<User>> {
    if UserRepo::count(pool).await? > 0 {
        tracing::debug!("Users already exist, skipping admin bootstrap");
        return Ok(None);
    }

    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Admin username must not be empty".into(),
        )));
    }
    validate_password_strength(password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Created admin user");
    Ok(Some(user))
}
