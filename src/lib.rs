use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub type DbPool = Pool<SqliteConnectionManager>;

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;

#[cfg(test)]
pub(crate) mod test_support {
    use super::DbPool;
    use crate::setup::db_setup;
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;

    /// Builds a single-connection pool over an in-memory database carrying
    /// the real schema, so tests exercise the actual uniqueness and cascade
    /// rules.
    pub fn test_pool() -> DbPool {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            db_setup::create_schema(conn).expect("test schema setup failed");
            Ok(())
        });
        Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("failed to build test pool")
    }

    /// Inserts a user directly, skipping bcrypt so tests stay fast.
    pub fn insert_user(
        conn: &rusqlite::Connection,
        username: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> i64 {
        conn.execute(
            "INSERT INTO users (username, email, password_hash, is_staff, is_superuser, date_joined)
             VALUES (?1, ?2, 'x', ?3, ?4, ?5)",
            rusqlite::params![
                username,
                format!("{}@example.edu", username),
                is_staff,
                is_superuser,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .expect("insert_user failed");
        conn.last_insert_rowid()
    }

    pub fn add_group(conn: &rusqlite::Connection, user_id: i64, group: &str) {
        conn.execute(
            "INSERT OR IGNORE INTO user_groups (user_id, group_name) VALUES (?1, ?2)",
            rusqlite::params![user_id, group],
        )
        .expect("add_group failed");
    }

    pub fn insert_post(
        conn: &rusqlite::Connection,
        author_id: i64,
        title: &str,
        category: &str,
        status: &str,
    ) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO posts (author_id, title, content, category, status, created_at, updated_at)
             VALUES (?1, ?2, 'body', ?3, ?4, ?5, ?5)",
            rusqlite::params![author_id, title, category, status, now],
        )
        .expect("insert_post failed");
        conn.last_insert_rowid()
    }
}
