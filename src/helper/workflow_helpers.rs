use crate::helper::sanitization_helpers;
use crate::models::db_operations::{posts_db_operations, users_db_operations};
use crate::models::{Capabilities, Category, Post, PostDraft, PostStatus};
use crate::DbPool;
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("Post not found")]
    NotFound,
}

pub const MIN_TITLE_LEN: usize = 5;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_SUMMARY_LEN: usize = 300;

#[derive(Debug)]
pub enum BulkOutcome {
    Applied { action: &'static str, requested: usize, affected: usize },
    NothingSelected,
}

struct CleanDraft {
    title: String,
    summary: Option<String>,
    content: String,
    category: Category,
    cover: Option<String>,
}

/// Validation and sanitization shared by submit and edit. Nothing is written
/// when this fails.
fn clean_draft(draft: &PostDraft) -> Result<CleanDraft, WorkflowError> {
    let category = Category::from_str(draft.category.trim()).ok_or_else(|| {
        WorkflowError::Validation(format!("Unknown category '{}'.", draft.category))
    })?;

    let title = sanitization_helpers::strip_all_html(draft.title.trim());
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(WorkflowError::Validation(format!(
            "Title must be at least {} characters.",
            MIN_TITLE_LEN
        )));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(WorkflowError::Validation(format!(
            "Title must be at most {} characters.",
            MAX_TITLE_LEN
        )));
    }

    let content = sanitization_helpers::sanitize_body(draft.content.trim());
    if content.trim().is_empty() {
        return Err(WorkflowError::Validation("Content must not be empty.".to_string()));
    }

    let summary = match draft.summary.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => {
            let clean = sanitization_helpers::strip_all_html(s);
            if clean.chars().count() > MAX_SUMMARY_LEN {
                return Err(WorkflowError::Validation(format!(
                    "Summary must be at most {} characters.",
                    MAX_SUMMARY_LEN
                )));
            }
            Some(clean)
        }
        _ => None,
    };

    let cover = draft
        .cover
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(sanitization_helpers::strip_all_html);

    Ok(CleanDraft {
        title,
        summary,
        content,
        category,
        cover,
    })
}

/// The submit policy, first match wins:
///   (a) KULUP from a submitter who is neither staff nor club_admin is
///       refused outright,
///   (b) staff publish immediately,
///   (c) approved publishers publish immediately,
///   (d) club admins publish immediately into KULUP,
///   (e) everyone else waits in PENDING.
/// Pure over (capability set, category); the only effect is the chosen state.
pub fn decide_initial_status(
    caps: &Capabilities,
    category: Category,
) -> Result<PostStatus, WorkflowError> {
    if category == Category::Kulup && !(caps.is_staff || caps.is_club_admin()) {
        return Err(WorkflowError::Forbidden(
            "You are not allowed to submit club content.".to_string(),
        ));
    }
    if caps.is_staff {
        return Ok(PostStatus::Approved);
    }
    if caps.is_approved_publisher() {
        return Ok(PostStatus::Approved);
    }
    if caps.is_club_admin() && category == Category::Kulup {
        return Ok(PostStatus::Approved);
    }
    Ok(PostStatus::Pending)
}

fn require_staff(conn: &Connection, actor_id: i64) -> Result<Capabilities, WorkflowError> {
    let caps = users_db_operations::capabilities_for_user(conn, actor_id)?;
    if !caps.is_staff {
        return Err(WorkflowError::Forbidden(
            "Staff permissions are required for this operation.".to_string(),
        ));
    }
    Ok(caps)
}

/// Submit a draft. The refusal branch of the policy fires before any row is
/// written.
pub fn submit_post(
    pool: &DbPool,
    submitter_id: i64,
    draft: &PostDraft,
) -> Result<(i64, PostStatus), WorkflowError> {
    let clean = clean_draft(draft)?;
    let conn = pool.get()?;
    let caps = users_db_operations::capabilities_for_user(&conn, submitter_id)?;
    let status = decide_initial_status(&caps, clean.category)?;
    let post_id = posts_db_operations::create_post(
        &conn,
        submitter_id,
        &clean.title,
        clean.summary.as_deref(),
        &clean.content,
        clean.category,
        clean.cover.as_deref(),
        status,
    )?;
    Ok((post_id, status))
}

fn transition(
    pool: &DbPool,
    actor_id: i64,
    post_id: i64,
    status: PostStatus,
) -> Result<Post, WorkflowError> {
    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;
    if posts_db_operations::set_status(&conn, post_id, status)? == 0 {
        return Err(WorkflowError::NotFound);
    }
    posts_db_operations::read_post(&conn, post_id)?.ok_or(WorkflowError::NotFound)
}

/// PENDING (or REJECTED) -> APPROVED.
pub fn approve_post(pool: &DbPool, actor_id: i64, post_id: i64) -> Result<Post, WorkflowError> {
    transition(pool, actor_id, post_id, PostStatus::Approved)
}

/// Any state -> REJECTED.
pub fn reject_post(pool: &DbPool, actor_id: i64, post_id: i64) -> Result<Post, WorkflowError> {
    transition(pool, actor_id, post_id, PostStatus::Rejected)
}

/// Undo a rejection without re-approving: back to PENDING.
pub fn restore_post(pool: &DbPool, actor_id: i64, post_id: i64) -> Result<Post, WorkflowError> {
    transition(pool, actor_id, post_id, PostStatus::Pending)
}

/// Hard delete; likes, comments and views go with the row. Irreversible,
/// unlike reject/restore.
pub fn delete_post(pool: &DbPool, actor_id: i64, post_id: i64) -> Result<(), WorkflowError> {
    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;
    if posts_db_operations::delete_post(&conn, post_id)? == 0 {
        return Err(WorkflowError::NotFound);
    }
    Ok(())
}

/// Bulk approve/delete over an id set. An empty selection is a no-op
/// warning, an unknown action a validation error. The set is not applied
/// all-or-nothing; the affected count in the outcome reports what actually
/// happened.
pub fn bulk_action(
    pool: &DbPool,
    actor_id: i64,
    action: &str,
    post_ids: &[i64],
) -> Result<BulkOutcome, WorkflowError> {
    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;

    if post_ids.is_empty() {
        return Ok(BulkOutcome::NothingSelected);
    }

    let (action_name, affected) = match action {
        "approve" => ("approve", posts_db_operations::bulk_approve(&conn, post_ids)?),
        "delete" => ("delete", posts_db_operations::bulk_delete(&conn, post_ids)?),
        other => {
            return Err(WorkflowError::Validation(format!(
                "Unknown bulk action '{}'.",
                other
            )))
        }
    };

    Ok(BulkOutcome::Applied {
        action: action_name,
        requested: post_ids.len(),
        affected,
    })
}

/// Rewrites the content fields at any status without touching the status.
/// Allowed for staff, and for the post's author when the author is a club
/// admin and the post is club content.
pub fn edit_post(
    pool: &DbPool,
    actor_id: i64,
    post_id: i64,
    draft: &PostDraft,
) -> Result<Post, WorkflowError> {
    let clean = clean_draft(draft)?;
    let conn = pool.get()?;
    let caps = users_db_operations::capabilities_for_user(&conn, actor_id)?;
    let (author_id, category, _) =
        posts_db_operations::read_post_meta(&conn, post_id)?.ok_or(WorkflowError::NotFound)?;

    let allowed = caps.is_staff
        || (author_id == actor_id && caps.is_club_admin() && category == Category::Kulup);
    if !allowed {
        return Err(WorkflowError::Forbidden(
            "You are not allowed to edit this post.".to_string(),
        ));
    }

    posts_db_operations::update_post_fields(
        &conn,
        post_id,
        &clean.title,
        clean.summary.as_deref(),
        &clean.content,
        clean.category,
        clean.cover.as_deref(),
    )?;
    posts_db_operations::read_post(&conn, post_id)?.ok_or(WorkflowError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_group, insert_user, test_pool};

    fn caps(staff: bool, superuser: bool, roles: &[&str]) -> Capabilities {
        Capabilities {
            is_staff: staff,
            is_superuser: superuser,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn draft(category: &str) -> PostDraft {
        PostDraft {
            title: "Final week library hours".to_string(),
            category: category.to_string(),
            summary: Some("Open around the clock".to_string()),
            content: "The library stays open all week.".to_string(),
            cover: None,
        }
    }

    #[test]
    fn policy_refuses_club_content_from_plain_users() {
        let err = decide_initial_status(&caps(false, false, &[]), Category::Kulup).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
        // approved_publisher alone is not enough for club content either
        let err = decide_initial_status(
            &caps(false, false, &["approved_publisher"]),
            Category::Kulup,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
    }

    #[test]
    fn policy_approves_staff_for_every_category() {
        for category in [
            Category::Gundem,
            Category::Etkinlik,
            Category::Duyuru,
            Category::Kulup,
        ] {
            let status = decide_initial_status(&caps(true, false, &[]), category).unwrap();
            assert_eq!(status, PostStatus::Approved);
        }
    }

    #[test]
    fn policy_approves_publishers_and_club_admins_where_entitled() {
        let publisher = caps(false, false, &["approved_publisher"]);
        assert_eq!(
            decide_initial_status(&publisher, Category::Gundem).unwrap(),
            PostStatus::Approved
        );

        let club_admin = caps(false, false, &["club_admin"]);
        assert_eq!(
            decide_initial_status(&club_admin, Category::Kulup).unwrap(),
            PostStatus::Approved
        );
        // club_admin outside KULUP falls through to PENDING
        assert_eq!(
            decide_initial_status(&club_admin, Category::Duyuru).unwrap(),
            PostStatus::Pending
        );
    }

    #[test]
    fn policy_defaults_to_pending() {
        assert_eq!(
            decide_initial_status(&caps(false, false, &[]), Category::Gundem).unwrap(),
            PostStatus::Pending
        );
    }

    #[test]
    fn refused_club_submission_writes_no_row() {
        let pool = test_pool();
        let user = insert_user(&pool.get().unwrap(), "plain", false, false);

        let err = submit_post(&pool, user, &draft("KULUP")).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn moderation_scenario_runs_the_full_cycle() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = insert_user(&conn, "student", false, false);
        let staff = insert_user(&conn, "moderator", true, false);
        drop(conn);

        let (post_id, status) = submit_post(&pool, user, &draft("GUNDEM")).unwrap();
        assert_eq!(status, PostStatus::Pending);

        let post = approve_post(&pool, staff, post_id).unwrap();
        assert_eq!(post.status, PostStatus::Approved);
        assert!(post.is_approved);

        let post = reject_post(&pool, staff, post_id).unwrap();
        assert_eq!(post.status, PostStatus::Rejected);
        assert!(!post.is_approved);

        let post = restore_post(&pool, staff, post_id).unwrap();
        assert_eq!(post.status, PostStatus::Pending);
        assert!(!post.is_approved);

        // admin can approve straight out of REJECTED as well
        reject_post(&pool, staff, post_id).unwrap();
        let post = approve_post(&pool, staff, post_id).unwrap();
        assert_eq!(post.status, PostStatus::Approved);
    }

    #[test]
    fn transitions_require_staff_and_mutate_nothing_otherwise() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = insert_user(&conn, "student", false, false);
        drop(conn);

        let (post_id, _) = submit_post(&pool, user, &draft("GUNDEM")).unwrap();
        let err = approve_post(&pool, user, post_id).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let status: String = pool
            .get()
            .unwrap()
            .query_row("SELECT status FROM posts WHERE id = ?1", [post_id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(status, "PENDING");
    }

    #[test]
    fn bulk_rejects_unknown_actions_and_warns_on_empty_selection() {
        let pool = test_pool();
        let staff = insert_user(&pool.get().unwrap(), "moderator", true, false);

        assert!(matches!(
            bulk_action(&pool, staff, "archive", &[1]).unwrap_err(),
            WorkflowError::Validation(_)
        ));
        assert!(matches!(
            bulk_action(&pool, staff, "approve", &[]).unwrap(),
            BulkOutcome::NothingSelected
        ));
    }

    #[test]
    fn bulk_approve_and_delete_apply_across_the_set() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = insert_user(&conn, "student", false, false);
        let staff = insert_user(&conn, "moderator", true, false);
        let a = crate::test_support::insert_post(&conn, user, "first post", "GUNDEM", "PENDING");
        let b = crate::test_support::insert_post(&conn, user, "second post", "GUNDEM", "APPROVED");
        drop(conn);

        match bulk_action(&pool, staff, "approve", &[a, b]).unwrap() {
            BulkOutcome::Applied { affected, .. } => assert_eq!(affected, 2),
            _ => panic!("expected applied outcome"),
        }

        match bulk_action(&pool, staff, "delete", &[a, b]).unwrap() {
            BulkOutcome::Applied { affected, .. } => assert_eq!(affected, 2),
            _ => panic!("expected applied outcome"),
        }
        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn club_admins_may_edit_their_own_club_posts_only() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let owner = insert_user(&conn, "club_owner", false, false);
        add_group(&conn, owner, "club_admin");
        let outsider = insert_user(&conn, "other", false, false);
        add_group(&conn, outsider, "club_admin");
        let club_post =
            crate::test_support::insert_post(&conn, owner, "club night", "KULUP", "APPROVED");
        let news_post =
            crate::test_support::insert_post(&conn, owner, "general news", "GUNDEM", "APPROVED");
        drop(conn);

        let edit = PostDraft {
            title: "Club night, rescheduled".to_string(),
            category: "KULUP".to_string(),
            summary: None,
            content: "New date inside.".to_string(),
            cover: None,
        };

        let post = edit_post(&pool, owner, club_post, &edit).unwrap();
        assert_eq!(post.title, "Club night, rescheduled");
        assert_eq!(post.status, PostStatus::Approved, "edit must not change status");

        assert!(matches!(
            edit_post(&pool, outsider, club_post, &edit).unwrap_err(),
            WorkflowError::Forbidden(_)
        ));
        // Own post, but not club content: the club_admin shortcut does not apply.
        assert!(matches!(
            edit_post(&pool, owner, news_post, &edit).unwrap_err(),
            WorkflowError::Forbidden(_)
        ));
    }

    #[test]
    fn drafts_are_validated_before_any_write() {
        let pool = test_pool();
        let user = insert_user(&pool.get().unwrap(), "student", false, false);

        let mut short_title = draft("GUNDEM");
        short_title.title = "Hey".to_string();
        assert!(matches!(
            submit_post(&pool, user, &short_title).unwrap_err(),
            WorkflowError::Validation(_)
        ));

        let mut bad_category = draft("GUNDEM");
        bad_category.category = "SPOR".to_string();
        assert!(matches!(
            submit_post(&pool, user, &bad_category).unwrap_err(),
            WorkflowError::Validation(_)
        ));

        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
