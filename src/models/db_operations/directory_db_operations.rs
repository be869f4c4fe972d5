use crate::models::{Department, Profile};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

pub fn get_or_create_university(conn: &Connection, name: &str) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT OR IGNORE INTO universities (name) VALUES (?1)",
        [name],
    )?;
    conn.query_row("SELECT id FROM universities WHERE name = ?1", [name], |row| row.get(0))
}

pub fn get_or_create_department(
    conn: &Connection,
    university_id: i64,
    name: &str,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT OR IGNORE INTO departments (university_id, name) VALUES (?1, ?2)",
        params![university_id, name],
    )?;
    conn.query_row(
        "SELECT id FROM departments WHERE university_id = ?1 AND name = ?2",
        params![university_id, name],
        |row| row.get(0),
    )
}

pub fn departments_for_university(
    conn: &Connection,
    university_id: i64,
) -> Result<Vec<Department>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM departments WHERE university_id = ?1 ORDER BY name",
    )?;
    let departments = stmt
        .query_map([university_id], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .filter_map(|d| d.ok())
        .collect();
    Ok(departments)
}

fn read_profile(conn: &Connection, user_id: i64) -> Result<Option<Profile>, RusqliteError> {
    conn.query_row(
        "SELECT pr.user_id, pr.university_id, un.name, pr.department_id, de.name,
                pr.avatar, pr.notifications_enabled, pr.created_at
         FROM profiles pr
         LEFT JOIN universities un ON un.id = pr.university_id
         LEFT JOIN departments de ON de.id = pr.department_id
         WHERE pr.user_id = ?1",
        [user_id],
        |row| {
            Ok(Profile {
                user_id: row.get(0)?,
                university_id: row.get(1)?,
                university_name: row.get(2)?,
                department_id: row.get(3)?,
                department_name: row.get(4)?,
                avatar: row.get(5)?,
                notifications_enabled: row.get(6)?,
                created_at: row.get(7)?,
            })
        },
    )
    .optional()
}

/// Fetch-or-create, so a user who predates the profiles table still gets one
/// on first touch.
pub fn get_or_create_profile(conn: &Connection, user_id: i64) -> Result<Profile, RusqliteError> {
    if let Some(profile) = read_profile(conn, user_id)? {
        return Ok(profile);
    }
    conn.execute(
        "INSERT OR IGNORE INTO profiles (user_id, created_at) VALUES (?1, ?2)",
        params![user_id, Utc::now().to_rfc3339()],
    )?;
    read_profile(conn, user_id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    university_id: Option<i64>,
    department_id: Option<i64>,
    notifications_enabled: bool,
) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE profiles SET university_id = ?1, department_id = ?2, notifications_enabled = ?3
         WHERE user_id = ?4",
        params![university_id, department_id, notifications_enabled, user_id],
    )?;
    Ok(())
}

pub fn update_avatar(conn: &Connection, user_id: i64, avatar: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE profiles SET avatar = ?1 WHERE user_id = ?2",
        params![avatar, user_id],
    )?;
    Ok(())
}
