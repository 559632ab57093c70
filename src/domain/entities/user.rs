//! User entity and its session-safe projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered blog user as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub nick_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
    pub avatar: Option<String>,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Projects the user into the shape stored in the session and returned to clients.
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            username: self.username.clone(),
            nick_name: self.nick_name.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            avatar: self.avatar.clone(),
        }
    }
}

/// User data kept in the session. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub nick_name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub avatar: Option<String>,
}

/// Input data for creating a user (password already hashed).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub nick_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
}
