use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Creates every table and index in one transaction. Safe to run repeatedly.
///
/// The (user, post) uniqueness constraints on likes and views are the sole
/// concurrency guard for the toggle/upsert operations, and the ON DELETE
/// CASCADE rules are what make post deletion sweep its likes, comments and
/// views. Connections must run with `PRAGMA foreign_keys = ON` for the
/// cascades to fire.
pub fn create_schema(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    println!("- Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_staff INTEGER NOT NULL DEFAULT 0,
            is_superuser INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            date_joined TEXT NOT NULL,
            last_login_time TEXT
        )",
        [],
    )?;

    println!("- Creating 'user_groups' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS user_groups (
            user_id INTEGER NOT NULL,
            group_name TEXT NOT NULL,
            UNIQUE (user_id, group_name),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'universities' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS universities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    println!("- Creating 'departments' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS departments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            university_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            UNIQUE (university_id, name),
            FOREIGN KEY (university_id) REFERENCES universities(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'profiles' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id INTEGER PRIMARY KEY,
            university_id INTEGER,
            department_id INTEGER,
            avatar TEXT,
            notifications_enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (university_id) REFERENCES universities(id) ON DELETE SET NULL,
            FOREIGN KEY (department_id) REFERENCES departments(id) ON DELETE SET NULL
        )",
        [],
    )?;

    println!("- Creating 'posts' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            author_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            summary TEXT,
            content TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('GUNDEM', 'ETKINLIK', 'DUYURU', 'KULUP')),
            cover TEXT,
            status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at)",
        [],
    )?;

    println!("- Creating 'post_likes' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS post_likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, post_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'post_comments' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS post_comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'post_views' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS post_views (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            last_viewed_at TEXT NOT NULL,
            UNIQUE (user_id, post_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'ai_messages' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS ai_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn schema_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        create_schema(&mut conn).unwrap();
        conn
    }

    #[test]
    fn schema_is_idempotent() {
        let mut conn = schema_conn();
        create_schema(&mut conn).unwrap();
    }

    #[test]
    fn deleting_a_post_cascades_to_engagement_rows() {
        let conn = schema_conn();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, date_joined) VALUES ('u', 'u@e', 'x', ?1)",
            [&now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO posts (author_id, title, content, category, status, created_at, updated_at)
             VALUES (1, 'title', 'body', 'GUNDEM', 'APPROVED', ?1, ?1)",
            [&now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO post_likes (user_id, post_id, created_at) VALUES (1, 1, ?1)",
            [&now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO post_comments (user_id, post_id, text, created_at) VALUES (1, 1, 'hi', ?1)",
            [&now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO post_views (user_id, post_id, last_viewed_at) VALUES (1, 1, ?1)",
            [&now],
        )
        .unwrap();

        conn.execute("DELETE FROM posts WHERE id = 1", []).unwrap();

        for table in ["post_likes", "post_comments", "post_views"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert_eq!(count, 0, "{} should be empty after post delete", table);
        }
    }

    #[test]
    fn duplicate_like_is_rejected_by_the_store() {
        let conn = schema_conn();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, date_joined) VALUES ('u', 'u@e', 'x', ?1)",
            [&now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO posts (author_id, title, content, category, status, created_at, updated_at)
             VALUES (1, 'title', 'body', 'GUNDEM', 'APPROVED', ?1, ?1)",
            [&now],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO post_likes (user_id, post_id, created_at) VALUES (1, 1, ?1)",
            [&now],
        )
        .unwrap();
        let second = conn.execute(
            "INSERT INTO post_likes (user_id, post_id, created_at) VALUES (1, 1, ?1)",
            [&now],
        );
        assert!(second.is_err(), "second like insert must hit the unique constraint");
    }
}
