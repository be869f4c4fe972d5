use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod db_operations;

/// The two group names the role service manages. Other group names are never
/// touched by it.
pub const ROLE_APPROVED_PUBLISHER: &str = "approved_publisher";
pub const ROLE_CLUB_ADMIN: &str = "club_admin";
pub const MANAGED_ROLES: [&str; 2] = [ROLE_APPROVED_PUBLISHER, ROLE_CLUB_ADMIN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Gundem,
    Etkinlik,
    Duyuru,
    Kulup,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gundem => "GUNDEM",
            Category::Etkinlik => "ETKINLIK",
            Category::Duyuru => "DUYURU",
            Category::Kulup => "KULUP",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "GUNDEM" => Some(Category::Gundem),
            "ETKINLIK" => Some(Category::Etkinlik),
            "DUYURU" => Some(Category::Duyuru),
            "KULUP" => Some(Category::Kulup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Pending,
    Approved,
    Rejected,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "PENDING",
            PostStatus::Approved => "APPROVED",
            PostStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(PostStatus::Pending),
            "APPROVED" => Some(PostStatus::Approved),
            "REJECTED" => Some(PostStatus::Rejected),
            _ => None,
        }
    }

    /// The source system carried a redundant `is_approved` boolean beside the
    /// status column. It is collapsed into this enum; the flag only exists as
    /// a derived field on serialized posts.
    pub fn is_approved(&self) -> bool {
        matches!(self, PostStatus::Approved)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub category: Category,
    pub cover: Option<String>,
    pub status: PostStatus,
    pub is_approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Incoming fields for submit and edit. Sanitized and validated by the
/// workflow helpers before anything is written.
#[derive(Debug, Clone, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub category: String,
    pub summary: Option<String>,
    pub content: String,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: String,
    pub last_login_time: Option<String>,
}

/// What a caller currently is, read fresh from the store for every
/// authorization decision. Never cached in the session.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub is_staff: bool,
    pub is_superuser: bool,
    pub roles: HashSet<String>,
}

impl Capabilities {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_approved_publisher(&self) -> bool {
        self.has_role(ROLE_APPROVED_PUBLISHER)
    }

    pub fn is_club_admin(&self) -> bool {
        self.has_role(ROLE_CLUB_ADMIN)
    }
}

/// Multi-select role update: full replace of the managed groups.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RoleFlags {
    pub approved_publisher: bool,
    pub club_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user_id: i64,
    pub university_id: Option<i64>,
    pub university_name: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub avatar: Option<String>,
    pub notifications_enabled: bool,
    pub created_at: String,
}

/// A user row plus the engagement its posts have received, for the role
/// management listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithStats {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: String,
    pub post_count: i64,
    pub total_likes_received: i64,
    pub total_comments_received: i64,
    pub total_views_received: i64,
    pub role_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_news: i64,
    pub total_events: i64,
    pub total_announcements: i64,
    pub total_clubs: i64,
    pub total_users: i64,
    pub total_comments: i64,
    pub total_likes: i64,
    pub pending_approvals: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiMessage {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: String,
}
