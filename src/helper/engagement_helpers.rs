use crate::helper::sanitization_helpers;
use crate::models::db_operations::{engagement_db_operations, posts_db_operations};
use crate::DbPool;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngagementError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Post not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

pub const MAX_COMMENT_LEN: usize = 1500;

#[derive(Debug, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: i64,
}

/// Idempotent flip: two consecutive calls return the pair to its prior
/// state. Never errors on repeated toggling.
pub fn toggle_like(pool: &DbPool, user_id: i64, post_id: i64) -> Result<LikeOutcome, EngagementError> {
    let conn = pool.get()?;
    if posts_db_operations::read_post_meta(&conn, post_id)?.is_none() {
        return Err(EngagementError::NotFound);
    }
    let liked = engagement_db_operations::toggle_like(&conn, user_id, post_id)?;
    let like_count = engagement_db_operations::like_count(&conn, post_id)?;
    Ok(LikeOutcome { liked, like_count })
}

/// Upserts the (user, post) view row; always succeeds for an existing post.
pub fn record_view(pool: &DbPool, user_id: i64, post_id: i64) -> Result<(), EngagementError> {
    let conn = pool.get()?;
    if posts_db_operations::read_post_meta(&conn, post_id)?.is_none() {
        return Err(EngagementError::NotFound);
    }
    engagement_db_operations::record_view(&conn, user_id, post_id)?;
    Ok(())
}

/// Validates, strips markup and stores a comment. Nothing is written when
/// validation fails.
pub fn add_comment(
    pool: &DbPool,
    user_id: i64,
    post_id: i64,
    text: &str,
) -> Result<i64, EngagementError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngagementError::Validation("Comment cannot be empty.".to_string()));
    }
    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(EngagementError::Validation(format!(
            "Comment must be at most {} characters.",
            MAX_COMMENT_LEN
        )));
    }
    let clean = sanitization_helpers::strip_all_html(trimmed);
    if clean.trim().is_empty() {
        return Err(EngagementError::Validation("Comment cannot be empty.".to_string()));
    }

    let conn = pool.get()?;
    if posts_db_operations::read_post_meta(&conn, post_id)?.is_none() {
        return Err(EngagementError::NotFound);
    }
    Ok(engagement_db_operations::add_comment(&conn, user_id, post_id, &clean)?)
}
