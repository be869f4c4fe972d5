use crate::models::db_operations::users_db_operations;
use crate::models::{Capabilities, RoleFlags, UserWithStats, MANAGED_ROLES};
use crate::DbPool;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoleError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("User not found")]
    NotFound,
}

/// Display label for a capability set. An explicit ordered list of
/// (predicate, label) pairs, evaluated top-down; first hit wins. Pure; the
/// user record is never touched.
pub fn role_label(caps: &Capabilities) -> &'static str {
    let rules: [(fn(&Capabilities) -> bool, &'static str); 5] = [
        (|c| c.is_superuser, "superadmin"),
        (|c| c.is_staff, "admin"),
        (|c| c.is_approved_publisher(), "approved_publisher"),
        (|c| c.is_club_admin(), "club_admin"),
        (|_| true, "user"),
    ];
    for (matches, label) in rules {
        if matches(caps) {
            return label;
        }
    }
    unreachable!("the final rule matches everything")
}

fn require_staff(conn: &Connection, actor_id: i64) -> Result<(), RoleError> {
    let caps = users_db_operations::capabilities_for_user(conn, actor_id)?;
    if !caps.is_staff {
        return Err(RoleError::Forbidden(
            "Staff permissions are required for this operation.".to_string(),
        ));
    }
    Ok(())
}

fn require_target(conn: &Connection, target_user_id: i64) -> Result<(), RoleError> {
    if users_db_operations::read_user_by_id(conn, target_user_id).is_none() {
        return Err(RoleError::NotFound);
    }
    Ok(())
}

/// Multi-select shape: full replace of both managed groups from a flag set.
pub fn update_managed_roles(
    pool: &DbPool,
    actor_id: i64,
    target_user_id: i64,
    flags: &RoleFlags,
) -> Result<(), RoleError> {
    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;
    require_target(&conn, target_user_id)?;
    users_db_operations::set_managed_roles(&conn, target_user_id, flags)?;
    Ok(())
}

/// Single-role shape: at most one managed role, empty string meaning "no
/// managed role". Any other name is rejected before anything changes.
pub fn assign_single_role(
    pool: &DbPool,
    actor_id: i64,
    target_user_id: i64,
    role: &str,
) -> Result<(), RoleError> {
    if !role.is_empty() && !MANAGED_ROLES.contains(&role) {
        return Err(RoleError::Validation(format!("Invalid role '{}'.", role)));
    }

    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;
    require_target(&conn, target_user_id)?;

    users_db_operations::remove_managed_groups(&conn, target_user_id)?;
    if !role.is_empty() {
        users_db_operations::add_to_group(&conn, target_user_id, role)?;
    }
    Ok(())
}

/// The role management listing: all users, engagement received on their
/// posts, derived display label, optional username filter.
pub fn list_users_with_stats(
    pool: &DbPool,
    actor_id: i64,
    username_query: Option<&str>,
) -> Result<Vec<UserWithStats>, RoleError> {
    let conn = pool.get()?;
    require_staff(&conn, actor_id)?;

    // One pass over user_groups instead of a query per listed user.
    let mut groups_by_user: HashMap<i64, HashSet<String>> = HashMap::new();
    {
        let mut stmt = conn.prepare("SELECT user_id, group_name FROM user_groups")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows.filter_map(|r| r.ok()) {
            groups_by_user.entry(row.0).or_default().insert(row.1);
        }
    }

    let users = users_db_operations::read_users_with_post_stats(&conn, username_query)?;
    Ok(users
        .into_iter()
        .map(|(user, posts, likes, comments, views)| {
            let caps = Capabilities {
                is_staff: user.is_staff,
                is_superuser: user.is_superuser,
                roles: groups_by_user.remove(&user.id).unwrap_or_default(),
            };
            UserWithStats {
                id: user.id,
                username: user.username,
                email: user.email,
                is_staff: user.is_staff,
                is_superuser: user.is_superuser,
                date_joined: user.date_joined,
                post_count: posts,
                total_likes_received: likes,
                total_comments_received: comments,
                total_views_received: views,
                role_label: role_label(&caps),
            }
        })
        .collect())
}
