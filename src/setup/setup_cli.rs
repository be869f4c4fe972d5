use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rusqlite::{params, Connection};
use std::fs;
use std::path::PathBuf;
use uninews_backend::config::Config;
use uninews_backend::setup::db_setup;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_database(&config),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => create_admin_user(&config, username, email, password),
            AdminAction::List => list_admin_users(&config),
            AdminAction::ChangePassword {
                username,
                new_password,
            } => change_admin_password(&config, username, new_password),
        },
    }
}

fn open_database(config: &Config) -> Option<Connection> {
    let db_path = config.db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    let conn = Connection::open(&db_path).expect("Could not open the application database.");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("Could not enable foreign keys.");
    Some(conn)
}

fn setup_database(config: &Config) {
    let db_path = config.db_path();
    if db_path.exists() {
        println!(
            "ℹ️ Database already exists at '{}'. Skipping creation.",
            db_path.display()
        );
        return;
    }
    println!("\nSetting up database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create database file.");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("Could not enable foreign keys.");
    match db_setup::create_schema(&mut conn) {
        Ok(_) => println!("✅ Database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up database: {}", e),
    }
}

/// Creates a staff + superuser account, the equivalent of the framework's
/// create-superuser step in the source system.
fn create_admin_user(config: &Config, username: &str, email: &str, password: &str) {
    let conn = match open_database(config) {
        Some(c) => c,
        None => return,
    };
    let hashed_password = hash(password, DEFAULT_COST).expect("Failed to hash password");

    match conn.execute(
        "INSERT INTO users (username, email, password_hash, is_staff, is_superuser, date_joined)
         VALUES (?1, ?2, ?3, 1, 1, ?4)",
        params![username, email, hashed_password, Utc::now().to_rfc3339()],
    ) {
        Ok(_) => println!("✅ Admin user '{}' created successfully.", username),
        Err(e) => eprintln!(
            "❌ Error creating admin user: {}. The username or e-mail might already exist.",
            e
        ),
    }
}

fn list_admin_users(config: &Config) {
    let conn = match open_database(config) {
        Some(c) => c,
        None => return,
    };
    let mut stmt = match conn.prepare("SELECT username FROM users WHERE is_staff = 1 ORDER BY username") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Error preparing database query: {}", e);
            return;
        }
    };
    let user_iter = stmt.query_map([], |row| row.get::<_, String>(0));

    println!("Listing staff users:");
    match user_iter {
        Ok(users) => {
            for user in users {
                println!("- {}", user.unwrap_or_else(|_| "Invalid username".to_string()));
            }
        }
        Err(e) => eprintln!("❌ Error fetching staff users: {}", e),
    }
}

fn change_admin_password(config: &Config, username: &str, new_password: &str) {
    let conn = match open_database(config) {
        Some(c) => c,
        None => return,
    };
    let hashed_password = hash(new_password, DEFAULT_COST).expect("Failed to hash new password");
    match conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE username = ?2 AND is_staff = 1",
        params![hashed_password, username],
    ) {
        Ok(0) => eprintln!("❌ Error: No staff user named '{}' found.", username),
        Ok(_) => println!("✅ Password for staff user '{}' changed successfully.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
