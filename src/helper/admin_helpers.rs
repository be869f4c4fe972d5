use crate::models::db_operations::{
    engagement_db_operations, posts_db_operations, users_db_operations,
};
use crate::models::{
    Category, CommentRow, DashboardStats, Post, PostStatus, UserAccount,
};
use crate::DbPool;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("{0}")]
    Forbidden(String),
}

pub const APPROVED_PAGE_SIZE: u32 = 10;
const LATEST_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default)]
pub struct DashboardFilters {
    pub text_query: Option<String>,
    pub category: Option<Category>,
    pub status: Option<PostStatus>,
    pub oldest_first: bool,
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub approved_items: Vec<Post>,
    pub approved_page: u32,
    pub pending_items: Vec<Post>,
    pub rejected_items: Vec<Post>,
    pub latest_news: Vec<Post>,
    pub latest_comments: Vec<CommentRow>,
    pub latest_users: Vec<UserAccount>,
}

fn require_staff(conn: &Connection, actor_id: i64) -> Result<(), AdminHelperError> {
    let caps = users_db_operations::capabilities_for_user(conn, actor_id)?;
    if !caps.is_staff {
        return Err(AdminHelperError::Forbidden(
            "Staff permissions are required for this operation.".to_string(),
        ));
    }
    Ok(())
}

fn collect_stats(conn: &Connection) -> Result<DashboardStats, AdminHelperError> {
    Ok(DashboardStats {
        total_news: posts_db_operations::count_approved_in_category(conn, Category::Gundem)?,
        total_events: posts_db_operations::count_approved_in_category(conn, Category::Etkinlik)?,
        total_announcements: posts_db_operations::count_approved_in_category(conn, Category::Duyuru)?,
        total_clubs: posts_db_operations::count_approved_in_category(conn, Category::Kulup)?,
        total_users: users_db_operations::count_users(conn)?,
        total_comments: engagement_db_operations::count_all_comments(conn)?,
        total_likes: engagement_db_operations::count_all_likes(conn)?,
        pending_approvals: posts_db_operations::count_with_status(conn, PostStatus::Pending)?,
    })
}

/// The moderation dashboard: stats block, the three status buckets under the
/// shared filters (the approved bucket paginated), and the latest-activity
/// lists. An explicit status filter empties the other two buckets, matching
/// the single filtered queryset it is derived from.
pub fn fetch_dashboard(
    pool: &DbPool,
    actor_id: i64,
    filters: &DashboardFilters,
) -> Result<DashboardData, AdminHelperError> {
    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;

    let page = filters.page.max(1);
    let text_query = filters.text_query.as_deref();

    let bucket = |status: PostStatus, limit: i64, offset: u32| -> Result<Vec<Post>, AdminHelperError> {
        if filters.status.map_or(false, |s| s != status) {
            return Ok(Vec::new());
        }
        Ok(posts_db_operations::read_posts_filtered(
            &conn,
            text_query,
            filters.category,
            Some(status),
            filters.oldest_first,
            limit,
            offset,
        )?)
    };

    let approved_items = bucket(
        PostStatus::Approved,
        APPROVED_PAGE_SIZE as i64,
        (page - 1) * APPROVED_PAGE_SIZE,
    )?;
    let pending_items = bucket(PostStatus::Pending, -1, 0)?;
    let rejected_items = bucket(PostStatus::Rejected, -1, 0)?;

    Ok(DashboardData {
        stats: collect_stats(&conn)?,
        approved_items,
        approved_page: page,
        pending_items,
        rejected_items,
        latest_news: posts_db_operations::latest_approved(&conn, LATEST_LIMIT)?,
        latest_comments: engagement_db_operations::latest_comments(&conn, LATEST_LIMIT)?,
        latest_users: users_db_operations::latest_users(&conn, LATEST_LIMIT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_post, insert_user, test_pool};

    #[test]
    fn dashboard_requires_staff() {
        let pool = test_pool();
        let plain = insert_user(&pool.get().unwrap(), "member", false, false);
        assert!(matches!(
            fetch_dashboard(&pool, plain, &DashboardFilters::default()).unwrap_err(),
            AdminHelperError::Forbidden(_)
        ));
    }

    #[test]
    fn buckets_and_stats_split_by_status() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let staff = insert_user(&conn, "moderator", true, false);
        let author = insert_user(&conn, "student", false, false);
        insert_post(&conn, author, "approved news", "GUNDEM", "APPROVED");
        insert_post(&conn, author, "waiting news", "GUNDEM", "PENDING");
        insert_post(&conn, author, "binned news", "GUNDEM", "REJECTED");
        drop(conn);

        let data = fetch_dashboard(&pool, staff, &DashboardFilters::default()).unwrap();
        assert_eq!(data.approved_items.len(), 1);
        assert_eq!(data.pending_items.len(), 1);
        assert_eq!(data.rejected_items.len(), 1);
        assert_eq!(data.stats.total_news, 1);
        assert_eq!(data.stats.pending_approvals, 1);
        assert_eq!(data.latest_news.len(), 1);

        // A status filter narrows the view to one bucket.
        let filters = DashboardFilters {
            status: Some(PostStatus::Pending),
            ..Default::default()
        };
        let data = fetch_dashboard(&pool, staff, &filters).unwrap();
        assert!(data.approved_items.is_empty());
        assert_eq!(data.pending_items.len(), 1);
        assert!(data.rejected_items.is_empty());
    }
}
