use crate::models::{Capabilities, RoleFlags, UserAccount, MANAGED_ROLES};
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError};
use std::collections::HashSet;

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        is_staff: row.get(3)?,
        is_superuser: row.get(4)?,
        is_active: row.get(5)?,
        date_joined: row.get(6)?,
        last_login_time: row.get(7)?,
    })
}

const USER_COLUMNS: &str =
    "id, username, email, is_staff, is_superuser, is_active, date_joined, last_login_time";

pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password: &str,
    is_staff: bool,
) -> Result<i64, RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO users (username, email, password_hash, is_staff, date_joined) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, email, hashed_password, is_staff, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_user_by_id(conn: &Connection, user_id: i64) -> Option<UserAccount> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [user_id],
        map_user_row,
    )
    .ok()
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Option<UserAccount> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
        [username],
        map_user_row,
    )
    .ok()
}

pub fn username_exists(conn: &Connection, username: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [username],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

pub fn email_exists(conn: &Connection, email: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [email],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

pub fn get_username_by_id(conn: &Connection, user_id: i64) -> Result<String, RusqliteError> {
    conn.query_row("SELECT username FROM users WHERE id = ?1", [user_id], |row| row.get(0))
}

pub fn verify_credentials(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Option<UserAccount> {
    let res: rusqlite::Result<(String, UserAccount)> = conn.query_row(
        &format!(
            "SELECT password_hash, {} FROM users WHERE username = ?1",
            USER_COLUMNS
        ),
        [username],
        |row| {
            let password_hash: String = row.get(0)?;
            let user = UserAccount {
                id: row.get(1)?,
                username: row.get(2)?,
                email: row.get(3)?,
                is_staff: row.get(4)?,
                is_superuser: row.get(5)?,
                is_active: row.get(6)?,
                date_joined: row.get(7)?,
                last_login_time: row.get(8)?,
            };
            Ok((password_hash, user))
        },
    );

    if let Ok((password_hash, user)) = res {
        if user.is_active && verify(password, &password_hash).unwrap_or(false) {
            return Some(user);
        }
    }
    None
}

pub fn update_last_login_time(conn: &Connection, user_id: i64) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_time = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

/// Loads the caller's live capability set. Every authorization decision goes
/// through this at call time; nothing is snapshotted into the session.
pub fn capabilities_for_user(
    conn: &Connection,
    user_id: i64,
) -> Result<Capabilities, RusqliteError> {
    let (is_staff, is_superuser): (bool, bool) = conn.query_row(
        "SELECT is_staff, is_superuser FROM users WHERE id = ?1",
        [user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare("SELECT group_name FROM user_groups WHERE user_id = ?1")?;
    let roles: HashSet<String> = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Capabilities {
        is_staff,
        is_superuser,
        roles,
    })
}

/// Full-replace update of the two managed groups: both memberships are
/// cleared, then exactly the flagged ones re-added. Applying the same flags
/// twice lands on the same membership.
pub fn set_managed_roles(
    conn: &Connection,
    user_id: i64,
    flags: &RoleFlags,
) -> Result<(), RusqliteError> {
    remove_managed_groups(conn, user_id)?;
    if flags.approved_publisher {
        add_to_group(conn, user_id, crate::models::ROLE_APPROVED_PUBLISHER)?;
    }
    if flags.club_admin {
        add_to_group(conn, user_id, crate::models::ROLE_CLUB_ADMIN)?;
    }
    Ok(())
}

pub fn remove_managed_groups(conn: &Connection, user_id: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "DELETE FROM user_groups WHERE user_id = ?1 AND group_name IN (?2, ?3)",
        params![user_id, MANAGED_ROLES[0], MANAGED_ROLES[1]],
    )?;
    Ok(())
}

pub fn add_to_group(conn: &Connection, user_id: i64, group_name: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT OR IGNORE INTO user_groups (user_id, group_name) VALUES (?1, ?2)",
        params![user_id, group_name],
    )?;
    Ok(())
}

pub fn count_users(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

pub fn latest_users(conn: &Connection, limit: u32) -> Result<Vec<UserAccount>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY date_joined DESC, id DESC LIMIT ?1",
        USER_COLUMNS
    ))?;
    let users = stmt
        .query_map([limit], map_user_row)?
        .filter_map(|u| u.ok())
        .collect();
    Ok(users)
}

/// Users with the engagement their posts have received, newest first, with
/// an optional username filter.
pub fn read_users_with_post_stats(
    conn: &Connection,
    username_query: Option<&str>,
) -> Result<Vec<(UserAccount, i64, i64, i64, i64)>, RusqliteError> {
    let sql = format!(
        "SELECT {user_cols},
                (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS post_count,
                (SELECT COUNT(*) FROM post_likes l JOIN posts p ON p.id = l.post_id WHERE p.author_id = u.id) AS likes_received,
                (SELECT COUNT(*) FROM post_comments c JOIN posts p ON p.id = c.post_id WHERE p.author_id = u.id) AS comments_received,
                (SELECT COUNT(*) FROM post_views v JOIN posts p ON p.id = v.post_id WHERE p.author_id = u.id) AS views_received
         FROM users u
         WHERE (?1 IS NULL OR u.username LIKE '%' || ?1 || '%')
         ORDER BY u.date_joined DESC, u.id DESC",
        user_cols = "u.id, u.username, u.email, u.is_staff, u.is_superuser, u.is_active, u.date_joined, u.last_login_time"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![username_query], |row| {
        let user = map_user_row(row)?;
        Ok((user, row.get(8)?, row.get(9)?, row.get(10)?, row.get(11)?))
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoleFlags;
    use crate::setup::db_setup;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db_setup::create_schema(&mut conn).unwrap();
        conn
    }

    #[test]
    fn credentials_round_trip() {
        let conn = conn();
        let id = create_user(&conn, "ayse", "ayse@uni.edu", "s3cret", false).unwrap();

        let user = verify_credentials(&conn, "ayse", "s3cret").expect("valid login");
        assert_eq!(user.id, id);
        assert!(verify_credentials(&conn, "ayse", "wrong").is_none());
        assert!(verify_credentials(&conn, "nobody", "s3cret").is_none());
    }

    #[test]
    fn inactive_accounts_cannot_log_in() {
        let conn = conn();
        create_user(&conn, "ayse", "ayse@uni.edu", "s3cret", false).unwrap();
        conn.execute("UPDATE users SET is_active = 0 WHERE username = 'ayse'", [])
            .unwrap();
        assert!(verify_credentials(&conn, "ayse", "s3cret").is_none());
    }

    #[test]
    fn capabilities_reflect_flags_and_groups() {
        let conn = conn();
        let id = create_user(&conn, "mod", "mod@uni.edu", "pw", true).unwrap();
        add_to_group(&conn, id, crate::models::ROLE_CLUB_ADMIN).unwrap();

        let caps = capabilities_for_user(&conn, id).unwrap();
        assert!(caps.is_staff);
        assert!(!caps.is_superuser);
        assert!(caps.is_club_admin());
        assert!(!caps.is_approved_publisher());
    }

    #[test]
    fn set_managed_roles_is_a_full_replace() {
        let conn = conn();
        let id = create_user(&conn, "u", "u@uni.edu", "pw", false).unwrap();

        set_managed_roles(
            &conn,
            id,
            &RoleFlags {
                approved_publisher: true,
                club_admin: true,
            },
        )
        .unwrap();
        set_managed_roles(
            &conn,
            id,
            &RoleFlags {
                approved_publisher: false,
                club_admin: true,
            },
        )
        .unwrap();

        let caps = capabilities_for_user(&conn, id).unwrap();
        assert!(!caps.is_approved_publisher());
        assert!(caps.is_club_admin());
    }

    #[test]
    fn unmanaged_groups_survive_role_updates() {
        let conn = conn();
        let id = create_user(&conn, "u", "u@uni.edu", "pw", false).unwrap();
        add_to_group(&conn, id, "chess_society").unwrap();

        set_managed_roles(
            &conn,
            id,
            &RoleFlags {
                approved_publisher: false,
                club_admin: false,
            },
        )
        .unwrap();

        let caps = capabilities_for_user(&conn, id).unwrap();
        assert!(caps.has_role("chess_society"));
    }
}
