use crate::models::db_operations::{
    directory_db_operations, engagement_db_operations, posts_db_operations, users_db_operations,
};
use crate::models::{Category, CommentRow, Department, Post, UserAccount};
use crate::DbPool;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublicError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub university_name: String,
    pub department_name: String,
    pub password1: String,
    pub password2: String,
}

/// Creates the account, its profile, and the university/department records
/// (get-or-create by trimmed name). All validation happens before the first
/// write.
pub fn register_user(pool: &DbPool, req: &RegisterRequest) -> Result<i64, PublicError> {
    let username = req.username.trim();
    let email = req.email.trim();
    let uni_name = req.university_name.trim();
    let dep_name = req.department_name.trim();

    if username.is_empty() || email.is_empty() {
        return Err(PublicError::Validation(
            "Username and e-mail are required.".to_string(),
        ));
    }
    if req.password1.is_empty() || req.password1 != req.password2 {
        return Err(PublicError::Validation("Passwords do not match.".to_string()));
    }

    let conn = pool.get()?;
    if users_db_operations::username_exists(&conn, username) {
        return Err(PublicError::Validation(
            "This username is already taken.".to_string(),
        ));
    }
    if users_db_operations::email_exists(&conn, email) {
        return Err(PublicError::Validation(
            "This e-mail is already registered.".to_string(),
        ));
    }

    let user_id = users_db_operations::create_user(&conn, username, email, &req.password1, false)?;
    directory_db_operations::get_or_create_profile(&conn, user_id)?;

    if !uni_name.is_empty() {
        let university_id = directory_db_operations::get_or_create_university(&conn, uni_name)?;
        let department_id = if dep_name.is_empty() {
            None
        } else {
            Some(directory_db_operations::get_or_create_department(
                &conn,
                university_id,
                dep_name,
            )?)
        };
        directory_db_operations::update_profile(
            &conn,
            user_id,
            Some(university_id),
            department_id,
            true,
        )?;
    }

    Ok(user_id)
}

/// Credential check plus the last-login bookkeeping.
pub fn login(pool: &DbPool, username: &str, password: &str) -> Option<UserAccount> {
    let conn = pool.get().ok()?;
    let user = users_db_operations::verify_credentials(&conn, username, password)?;
    users_db_operations::update_last_login_time(&conn, user.id).ok();
    Some(user)
}

pub fn approved_posts_by_category(
    pool: &DbPool,
    category: Category,
) -> Result<Vec<Post>, PublicError> {
    let conn = pool.get()?;
    Ok(posts_db_operations::read_approved_by_category(&conn, category)?)
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<CommentRow>,
    pub like_count: i64,
    pub liked: bool,
}

/// Detail page data. Staff see every status; for everyone else an unapproved
/// post is indistinguishable from a missing one. A view is recorded for
/// authenticated callers; anonymous reads leave no trace.
pub fn fetch_post_detail(
    pool: &DbPool,
    post_id: i64,
    viewer_id: Option<i64>,
) -> Result<PostDetail, PublicError> {
    let conn = pool.get()?;

    let staff = match viewer_id {
        Some(user_id) => users_db_operations::capabilities_for_user(&conn, user_id)?.is_staff,
        None => false,
    };

    let post = posts_db_operations::read_visible_post(&conn, post_id, staff)?
        .ok_or(PublicError::NotFound)?;

    if let Some(user_id) = viewer_id {
        engagement_db_operations::record_view(&conn, user_id, post_id)?;
    }

    let comments = engagement_db_operations::comments_for_post(&conn, post_id)?;
    let like_count = engagement_db_operations::like_count(&conn, post_id)?;
    let liked = match viewer_id {
        Some(user_id) => engagement_db_operations::has_liked(&conn, user_id, post_id)?,
        None => false,
    };

    Ok(PostDetail {
        post,
        comments,
        like_count,
        liked,
    })
}

const LIKED_POSTS_LIMIT: u32 = 8;
const RECENT_RAIL_LIMIT: u32 = 5;
const OWN_POSTS_LIMIT: u32 = 8;

#[derive(Serialize)]
pub struct ProfileOverview {
    pub profile: crate::models::Profile,
    pub like_count: i64,
    pub comment_count: i64,
    pub event_count: i64,
    pub liked_posts: Vec<Post>,
    pub recent_gundem: Vec<Post>,
    pub recent_etkinlik: Vec<Post>,
    pub recent_duyuru: Vec<Post>,
    pub recent_kulup: Vec<Post>,
    pub my_pending_posts: Vec<Post>,
    pub my_published_posts: Vec<Post>,
}

/// Everything the profile page shows: the profile record, the caller's
/// engagement totals, liked posts, the four per-category recency rails and
/// the caller's own pending/published buckets.
pub fn fetch_profile_overview(pool: &DbPool, user_id: i64) -> Result<ProfileOverview, PublicError> {
    let conn = pool.get()?;
    let profile = directory_db_operations::get_or_create_profile(&conn, user_id)?;

    let recent = |category: Category| {
        engagement_db_operations::recently_viewed_by_category(
            &conn,
            user_id,
            category,
            RECENT_RAIL_LIMIT,
        )
    };

    Ok(ProfileOverview {
        like_count: engagement_db_operations::likes_given_by_user(&conn, user_id)?,
        comment_count: engagement_db_operations::comments_written_by_user(&conn, user_id)?,
        event_count: posts_db_operations::count_posts_by_author_in_category(
            &conn,
            user_id,
            Category::Etkinlik,
        )?,
        liked_posts: engagement_db_operations::liked_posts(&conn, user_id, LIKED_POSTS_LIMIT)?,
        recent_gundem: recent(Category::Gundem)?,
        recent_etkinlik: recent(Category::Etkinlik)?,
        recent_duyuru: recent(Category::Duyuru)?,
        recent_kulup: recent(Category::Kulup)?,
        my_pending_posts: posts_db_operations::read_posts_by_author(
            &conn,
            user_id,
            false,
            OWN_POSTS_LIMIT,
        )?,
        my_published_posts: posts_db_operations::read_posts_by_author(
            &conn,
            user_id,
            true,
            OWN_POSTS_LIMIT,
        )?,
        profile,
    })
}

pub fn update_profile_settings(
    pool: &DbPool,
    user_id: i64,
    university_id: Option<i64>,
    department_id: Option<i64>,
    notifications_enabled: bool,
) -> Result<(), PublicError> {
    let conn = pool.get()?;
    directory_db_operations::get_or_create_profile(&conn, user_id)?;
    directory_db_operations::update_profile(
        &conn,
        user_id,
        university_id,
        department_id,
        notifications_enabled,
    )?;
    Ok(())
}

pub fn set_avatar(pool: &DbPool, user_id: i64, avatar: &str) -> Result<(), PublicError> {
    let conn = pool.get()?;
    directory_db_operations::get_or_create_profile(&conn, user_id)?;
    directory_db_operations::update_avatar(&conn, user_id, avatar)?;
    Ok(())
}

/// Department lookup for the registration form. A missing or non-numeric
/// university id yields an empty list, not an error.
pub fn departments_for_university(
    pool: &DbPool,
    university_id: Option<&str>,
) -> Result<Vec<Department>, PublicError> {
    let id = match university_id.and_then(|raw| raw.parse::<i64>().ok()) {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };
    let conn = pool.get()?;
    Ok(directory_db_operations::departments_for_university(&conn, id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_post, insert_user, test_pool};

    fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@uni.edu", username),
            university_name: "Ege University".to_string(),
            department_name: "Biology".to_string(),
            password1: "topsecret".to_string(),
            password2: "topsecret".to_string(),
        }
    }

    #[test]
    fn registration_creates_profile_and_directory_entries() {
        let pool = test_pool();
        let user_id = register_user(&pool, &register_request("deniz")).unwrap();

        let conn = pool.get().unwrap();
        let profile = directory_db_operations::get_or_create_profile(&conn, user_id).unwrap();
        assert_eq!(profile.university_name.as_deref(), Some("Ege University"));
        assert_eq!(profile.department_name.as_deref(), Some("Biology"));
        drop(conn);

        assert!(login(&pool, "deniz", "topsecret").is_some());
        assert!(login(&pool, "deniz", "nope").is_none());
    }

    #[test]
    fn registration_rejects_mismatched_passwords_and_duplicates() {
        let pool = test_pool();

        let mut bad = register_request("deniz");
        bad.password2 = "different".to_string();
        assert!(matches!(
            register_user(&pool, &bad).unwrap_err(),
            PublicError::Validation(_)
        ));

        register_user(&pool, &register_request("deniz")).unwrap();
        assert!(matches!(
            register_user(&pool, &register_request("deniz")).unwrap_err(),
            PublicError::Validation(_)
        ));
    }

    #[test]
    fn detail_visibility_depends_on_live_staff_capability() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let author = insert_user(&conn, "author", false, false);
        let staff = insert_user(&conn, "moderator", true, false);
        let pending = insert_post(&conn, author, "waiting post", "DUYURU", "PENDING");
        drop(conn);

        assert!(matches!(
            fetch_post_detail(&pool, pending, None).unwrap_err(),
            PublicError::NotFound
        ));
        assert!(matches!(
            fetch_post_detail(&pool, pending, Some(author)).unwrap_err(),
            PublicError::NotFound
        ));
        assert!(fetch_post_detail(&pool, pending, Some(staff)).is_ok());
    }

    #[test]
    fn authenticated_detail_reads_record_a_view() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let author = insert_user(&conn, "author", false, false);
        let post = insert_post(&conn, author, "public post", "GUNDEM", "APPROVED");
        drop(conn);

        fetch_post_detail(&pool, post, None).unwrap();
        fetch_post_detail(&pool, post, Some(author)).unwrap();
        fetch_post_detail(&pool, post, Some(author)).unwrap();

        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM post_views", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1, "anonymous reads leave no view row; repeats upsert");
    }
}
