use crate::models::{Category, Post, PostStatus};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

pub(crate) const POST_COLUMNS: &str = "p.id, p.author_id, u.username, p.title, p.summary, p.content, \
     p.category, p.cover, p.status, p.created_at, p.updated_at";

fn invalid_text(index: usize, value: &str) -> RusqliteError {
    RusqliteError::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("unexpected value '{}'", value).into(),
    )
}

pub(crate) fn map_post_row(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    let category_str: String = row.get(6)?;
    let status_str: String = row.get(8)?;
    let category = Category::from_str(&category_str).ok_or_else(|| invalid_text(6, &category_str))?;
    let status = PostStatus::from_str(&status_str).ok_or_else(|| invalid_text(8, &status_str))?;
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        content: row.get(5)?,
        category,
        cover: row.get(7)?,
        status,
        is_approved: status.is_approved(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create_post(
    conn: &Connection,
    author_id: i64,
    title: &str,
    summary: Option<&str>,
    content: &str,
    category: Category,
    cover: Option<&str>,
    status: PostStatus,
) -> Result<i64, RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO posts (author_id, title, summary, content, category, cover, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![author_id, title, summary, content, category.as_str(), cover, status.as_str(), now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_post(conn: &Connection, post_id: i64) -> Result<Option<Post>, RusqliteError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = ?1",
            POST_COLUMNS
        ),
        [post_id],
        map_post_row,
    )
    .optional()
}

/// Detail visibility rule: staff see every status; everyone else only sees
/// APPROVED posts, so an unapproved post reads as missing.
pub fn read_visible_post(
    conn: &Connection,
    post_id: i64,
    staff: bool,
) -> Result<Option<Post>, RusqliteError> {
    match read_post(conn, post_id)? {
        Some(post) if staff || post.status.is_approved() => Ok(Some(post)),
        _ => Ok(None),
    }
}

/// Returns (author_id, category, status) without pulling the body, for
/// authorization checks.
pub fn read_post_meta(
    conn: &Connection,
    post_id: i64,
) -> Result<Option<(i64, Category, PostStatus)>, RusqliteError> {
    conn.query_row(
        "SELECT author_id, category, status FROM posts WHERE id = ?1",
        [post_id],
        |row| {
            let category_str: String = row.get(1)?;
            let status_str: String = row.get(2)?;
            let category =
                Category::from_str(&category_str).ok_or_else(|| invalid_text(1, &category_str))?;
            let status =
                PostStatus::from_str(&status_str).ok_or_else(|| invalid_text(2, &status_str))?;
            Ok((row.get(0)?, category, status))
        },
    )
    .optional()
}

/// Rewrites the status column and refreshes `updated_at`. Returns the number
/// of rows touched (0 when the post does not exist).
pub fn set_status(
    conn: &Connection,
    post_id: i64,
    status: PostStatus,
) -> Result<usize, RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE posts SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, post_id],
    )
}

pub fn delete_post(conn: &Connection, post_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])
}

pub fn update_post_fields(
    conn: &Connection,
    post_id: i64,
    title: &str,
    summary: Option<&str>,
    content: &str,
    category: Category,
    cover: Option<&str>,
) -> Result<usize, RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE posts SET title = ?1, summary = ?2, content = ?3, category = ?4, cover = ?5, updated_at = ?6
         WHERE id = ?7",
        params![title, summary, content, category.as_str(), cover, now, post_id],
    )
}

pub fn read_approved_by_category(
    conn: &Connection,
    category: Category,
) -> Result<Vec<Post>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE p.status = 'APPROVED' AND p.category = ?1
         ORDER BY p.created_at DESC, p.id DESC",
        POST_COLUMNS
    ))?;
    let posts = stmt
        .query_map([category.as_str()], map_post_row)?
        .filter_map(|p| p.ok())
        .collect();
    Ok(posts)
}

/// Admin listing query: free-text filter over title/content/author name,
/// optional category and status filters, oldest-or-newest-first ordering.
/// A negative limit means "no limit" (SQLite semantics).
pub fn read_posts_filtered(
    conn: &Connection,
    text_query: Option<&str>,
    category: Option<Category>,
    status: Option<PostStatus>,
    oldest_first: bool,
    limit: i64,
    offset: u32,
) -> Result<Vec<Post>, RusqliteError> {
    let order = if oldest_first {
        "p.created_at ASC, p.id ASC"
    } else {
        "p.created_at DESC, p.id DESC"
    };
    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE (?1 IS NULL OR p.title LIKE '%' || ?1 || '%'
                OR p.content LIKE '%' || ?1 || '%'
                OR u.username LIKE '%' || ?1 || '%')
           AND (?2 IS NULL OR p.category = ?2)
           AND (?3 IS NULL OR p.status = ?3)
         ORDER BY {}
         LIMIT ?4 OFFSET ?5",
        POST_COLUMNS, order
    );
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(
            params![
                text_query,
                category.map(|c| c.as_str()),
                status.map(|s| s.as_str()),
                limit,
                offset
            ],
            map_post_row,
        )?
        .filter_map(|p| p.ok())
        .collect();
    Ok(posts)
}

pub fn count_approved_in_category(
    conn: &Connection,
    category: Category,
) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status = 'APPROVED' AND category = ?1",
        [category.as_str()],
        |row| row.get(0),
    )
}

pub fn count_with_status(conn: &Connection, status: PostStatus) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status = ?1",
        [status.as_str()],
        |row| row.get(0),
    )
}

pub fn latest_approved(conn: &Connection, limit: u32) -> Result<Vec<Post>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE p.status = 'APPROVED'
         ORDER BY p.created_at DESC, p.id DESC LIMIT ?1",
        POST_COLUMNS
    ))?;
    let posts = stmt
        .query_map([limit], map_post_row)?
        .filter_map(|p| p.ok())
        .collect();
    Ok(posts)
}

/// The profile buckets follow the source system: "published" is APPROVED,
/// "pending" is everything else (a rejected post stays in the author's
/// pending list).
pub fn read_posts_by_author(
    conn: &Connection,
    author_id: i64,
    approved_bucket: bool,
    limit: u32,
) -> Result<Vec<Post>, RusqliteError> {
    let filter = if approved_bucket {
        "p.status = 'APPROVED'"
    } else {
        "p.status != 'APPROVED'"
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE p.author_id = ?1 AND {}
         ORDER BY p.id DESC LIMIT ?2",
        POST_COLUMNS, filter
    ))?;
    let posts = stmt
        .query_map(params![author_id, limit], map_post_row)?
        .filter_map(|p| p.ok())
        .collect();
    Ok(posts)
}

pub fn count_posts_by_author_in_category(
    conn: &Connection,
    author_id: i64,
    category: Category,
) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE author_id = ?1 AND category = ?2",
        params![author_id, category.as_str()],
        |row| row.get(0),
    )
}

/// Applies APPROVED across the id set one row at a time. A mid-set failure
/// propagates after the earlier rows have been written; the caller reports
/// the partial application rather than hiding it.
pub fn bulk_approve(conn: &Connection, post_ids: &[i64]) -> Result<usize, RusqliteError> {
    let now = Utc::now().to_rfc3339();
    let mut affected = 0;
    for post_id in post_ids {
        affected += conn.execute(
            "UPDATE posts SET status = 'APPROVED', updated_at = ?1 WHERE id = ?2",
            params![now, post_id],
        )?;
    }
    Ok(affected)
}

pub fn bulk_delete(conn: &Connection, post_ids: &[i64]) -> Result<usize, RusqliteError> {
    let mut affected = 0;
    for post_id in post_ids {
        affected += conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;
    use rusqlite::Connection;

    fn conn_with_user() -> (Connection, i64) {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db_setup::create_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, date_joined) VALUES ('author', 'a@e', 'x', ?1)",
            [chrono::Utc::now().to_rfc3339()],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        (conn, id)
    }

    #[test]
    fn status_round_trip_keeps_derived_flag_consistent() {
        let (conn, author) = conn_with_user();
        let id = create_post(
            &conn,
            author,
            "Library open all night",
            None,
            "body",
            Category::Gundem,
            None,
            PostStatus::Pending,
        )
        .unwrap();

        set_status(&conn, id, PostStatus::Approved).unwrap();
        let post = read_post(&conn, id).unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Approved);
        assert!(post.is_approved);

        set_status(&conn, id, PostStatus::Rejected).unwrap();
        let post = read_post(&conn, id).unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Rejected);
        assert!(!post.is_approved);

        set_status(&conn, id, PostStatus::Pending).unwrap();
        let post = read_post(&conn, id).unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Pending);
        assert!(!post.is_approved);
    }

    #[test]
    fn visibility_hides_unapproved_posts_from_non_staff() {
        let (conn, author) = conn_with_user();
        let id = create_post(
            &conn,
            author,
            "Hidden until approved",
            None,
            "body",
            Category::Duyuru,
            None,
            PostStatus::Pending,
        )
        .unwrap();

        assert!(read_visible_post(&conn, id, false).unwrap().is_none());
        assert!(read_visible_post(&conn, id, true).unwrap().is_some());

        set_status(&conn, id, PostStatus::Approved).unwrap();
        assert!(read_visible_post(&conn, id, false).unwrap().is_some());
    }

    #[test]
    fn bulk_approve_covers_mixed_statuses() {
        let (conn, author) = conn_with_user();
        let pending = create_post(&conn, author, "one title", None, "b", Category::Gundem, None, PostStatus::Pending).unwrap();
        let approved = create_post(&conn, author, "two title", None, "b", Category::Gundem, None, PostStatus::Approved).unwrap();
        let rejected = create_post(&conn, author, "three title", None, "b", Category::Gundem, None, PostStatus::Rejected).unwrap();

        bulk_approve(&conn, &[pending, approved, rejected]).unwrap();

        for id in [pending, approved, rejected] {
            let post = read_post(&conn, id).unwrap().unwrap();
            assert_eq!(post.status, PostStatus::Approved);
        }
    }

    #[test]
    fn bulk_delete_removes_exactly_the_set() {
        let (conn, author) = conn_with_user();
        let keep = create_post(&conn, author, "keep title", None, "b", Category::Gundem, None, PostStatus::Approved).unwrap();
        let gone_a = create_post(&conn, author, "gone title", None, "b", Category::Gundem, None, PostStatus::Pending).unwrap();
        let gone_b = create_post(&conn, author, "also gone", None, "b", Category::Kulup, None, PostStatus::Approved).unwrap();

        let affected = bulk_delete(&conn, &[gone_a, gone_b]).unwrap();
        assert_eq!(affected, 2);
        assert!(read_post(&conn, keep).unwrap().is_some());
        assert!(read_post(&conn, gone_a).unwrap().is_none());
        assert!(read_post(&conn, gone_b).unwrap().is_none());
    }

    #[test]
    fn filtered_listing_matches_author_name() {
        let (conn, author) = conn_with_user();
        create_post(&conn, author, "Completely unrelated", None, "b", Category::Gundem, None, PostStatus::Approved).unwrap();

        let hits = read_posts_filtered(&conn, Some("author"), None, None, false, -1, 0).unwrap();
        assert_eq!(hits.len(), 1);
        let misses = read_posts_filtered(&conn, Some("ghost"), None, None, false, -1, 0).unwrap();
        assert!(misses.is_empty());
    }
}
