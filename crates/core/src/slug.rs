//! Slug and branch-name derivation for posts.
//!
//! The slug doubles as the post's file name in the site repository, so it
//! must be stable: the same title always yields the same slug.

use crate::error::CoreError;

/// Maximum accepted title length (characters).
pub const MAX_TITLE_LENGTH: usize = 200;

/// Convert a post title into a URL-safe slug.
///
/// - ASCII letters and digits are kept and lowercased.
/// - Whitespace and `-` act as separators; a run of separators becomes one `-`.
/// - Every other character is dropped.
/// - The result never starts or ends with `-`.
///
/// # Examples
///
/// ```
/// use inkwell_core::slug::slugify_title;
///
/// assert_eq!(slugify_title("Hello, World!"), "hello-world");
/// assert_eq!(slugify_title("Rust 2024: What's New?"), "rust-2024-whats-new");
/// ```
pub fn slugify_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
        }
    }

    slug
}

/// Build the unique branch name for a post.
///
/// Convention: `{prefix}-{slug}-{timestamp_millis}`. The timestamp is taken
/// once, when the post is first published, and the resulting name is stored
/// on the post; it is never recomputed.
pub fn branch_name(prefix: &str, slug: &str, timestamp_millis: i64) -> String {
    format!("{prefix}-{slug}-{timestamp_millis}")
}

/// Validate a post title.
///
/// The title must be non-blank, within [`MAX_TITLE_LENGTH`], and must
/// produce a non-empty slug (otherwise there is no file name to write).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    if slugify_title(trimmed).is_empty() {
        return Err(CoreError::Validation(
            "Title must contain at least one letter or digit".into(),
        ));
    }
    Ok(())
}
