pub mod ai_db_operations;
pub mod directory_db_operations;
pub mod engagement_db_operations;
pub mod posts_db_operations;
pub mod users_db_operations;
