use super::posts_db_operations::{map_post_row, POST_COLUMNS};
use crate::models::{Category, CommentRow, Post};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, ErrorCode};

fn is_unique_violation(err: &RusqliteError) -> bool {
    matches!(
        err,
        RusqliteError::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Idempotent like flip. Delete-first: a removed row means the caller just
/// unliked. Otherwise insert; if a concurrent toggle won the insert race the
/// unique constraint fires and the pair counts as already liked, never as an
/// error. Returns the resulting liked state.
pub fn toggle_like(conn: &Connection, user_id: i64, post_id: i64) -> Result<bool, RusqliteError> {
    let removed = conn.execute(
        "DELETE FROM post_likes WHERE user_id = ?1 AND post_id = ?2",
        params![user_id, post_id],
    )?;
    if removed > 0 {
        return Ok(false);
    }

    let inserted = conn.execute(
        "INSERT INTO post_likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, post_id, Utc::now().to_rfc3339()],
    );
    match inserted {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(true),
        Err(e) => Err(e),
    }
}

/// Upsert keyed on the (user, post) uniqueness constraint: repeated views
/// move `last_viewed_at` forward in place, never a second row.
pub fn record_view(conn: &Connection, user_id: i64, post_id: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO post_views (user_id, post_id, last_viewed_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id, post_id) DO UPDATE SET last_viewed_at = excluded.last_viewed_at",
        params![user_id, post_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn add_comment(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
    text: &str,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO post_comments (user_id, post_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, post_id, text, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn like_count(conn: &Connection, post_id: i64) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
        [post_id],
        |row| row.get(0),
    )
}

pub fn comment_count(conn: &Connection, post_id: i64) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM post_comments WHERE post_id = ?1",
        [post_id],
        |row| row.get(0),
    )
}

pub fn has_liked(conn: &Connection, user_id: i64, post_id: i64) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM post_likes WHERE user_id = ?1 AND post_id = ?2)",
        params![user_id, post_id],
        |row| row.get(0),
    )
}

pub fn comments_for_post(conn: &Connection, post_id: i64) -> Result<Vec<CommentRow>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.user_id, u.username, c.text, c.created_at
         FROM post_comments c JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let comments = stmt
        .query_map([post_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                username: row.get(3)?,
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .filter_map(|c| c.ok())
        .collect();
    Ok(comments)
}

pub fn latest_comments(conn: &Connection, limit: u32) -> Result<Vec<CommentRow>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.user_id, u.username, c.text, c.created_at
         FROM post_comments c JOIN users u ON u.id = c.user_id
         ORDER BY c.created_at DESC, c.id DESC LIMIT ?1",
    )?;
    let comments = stmt
        .query_map([limit], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                username: row.get(3)?,
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .filter_map(|c| c.ok())
        .collect();
    Ok(comments)
}

pub fn count_all_likes(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM post_likes", [], |row| row.get(0))
}

pub fn count_all_comments(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM post_comments", [], |row| row.get(0))
}

pub fn likes_given_by_user(conn: &Connection, user_id: i64) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM post_likes WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )
}

pub fn comments_written_by_user(conn: &Connection, user_id: i64) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM post_comments WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )
}

/// Approved posts the user has liked, newest like first, capped.
pub fn liked_posts(
    conn: &Connection,
    user_id: i64,
    limit: u32,
) -> Result<Vec<Post>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p
         JOIN users u ON u.id = p.author_id
         JOIN post_likes l ON l.post_id = p.id
         WHERE l.user_id = ?1 AND p.status = 'APPROVED'
         ORDER BY l.created_at DESC, l.id DESC LIMIT ?2",
        POST_COLUMNS
    ))?;
    let posts = stmt
        .query_map(params![user_id, limit], map_post_row)?
        .filter_map(|p| p.ok())
        .collect();
    Ok(posts)
}

/// Approved posts of one category the user has viewed, most recently viewed
/// first, capped. Equal timestamps fall back to arrival order of the view
/// rows; nothing stronger is promised.
pub fn recently_viewed_by_category(
    conn: &Connection,
    user_id: i64,
    category: Category,
    limit: u32,
) -> Result<Vec<Post>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p
         JOIN users u ON u.id = p.author_id
         JOIN post_views v ON v.post_id = p.id
         WHERE v.user_id = ?1 AND p.category = ?2 AND p.status = 'APPROVED'
         ORDER BY v.last_viewed_at DESC, v.id DESC LIMIT ?3",
        POST_COLUMNS
    ))?;
    let posts = stmt
        .query_map(params![user_id, category.as_str(), limit], map_post_row)?
        .filter_map(|p| p.ok())
        .collect();
    Ok(posts)
}
