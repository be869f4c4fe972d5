use crate::models::AiMessage;
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError};

/// Persists a finished exchange. Callers only reach this after the
/// collaborator answered, so no half-written records exist.
pub fn insert_message(
    conn: &Connection,
    user_id: i64,
    question: &str,
    answer: &str,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO ai_messages (user_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, question, answer, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn history_for_user(
    conn: &Connection,
    user_id: i64,
    limit: u32,
) -> Result<Vec<AiMessage>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, question, answer, created_at FROM ai_messages
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let messages = stmt
        .query_map(params![user_id, limit], |row| {
            Ok(AiMessage {
                id: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .filter_map(|m| m.ok())
        .collect();
    Ok(messages)
}

pub fn clear_for_user(conn: &Connection, user_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM ai_messages WHERE user_id = ?1", [user_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;
    use rusqlite::Connection;

    #[test]
    fn history_is_per_user_and_clearable() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db_setup::create_schema(&mut conn).unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        for name in ["a", "b"] {
            conn.execute(
                "INSERT INTO users (username, email, password_hash, date_joined) VALUES (?1, ?2, 'x', ?3)",
                params![name, format!("{}@e", name), now],
            )
            .unwrap();
        }

        insert_message(&conn, 1, "when are finals?", "check the calendar").unwrap();
        insert_message(&conn, 2, "cafeteria hours?", "8 to 20").unwrap();

        assert_eq!(history_for_user(&conn, 1, 30).unwrap().len(), 1);
        assert_eq!(clear_for_user(&conn, 1).unwrap(), 1);
        assert!(history_for_user(&conn, 1, 30).unwrap().is_empty());
        assert_eq!(history_for_user(&conn, 2, 30).unwrap().len(), 1);
    }
}
