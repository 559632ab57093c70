//! Login audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the user authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginType {
    /// Credentials typed into the login form.
    Default,
    /// Restored from remember-me cookies.
    Remembered,
}

impl LoginType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Remembered => "remembered",
        }
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted login event.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoginRecord {
    pub id: i64,
    pub user_id: i64,
    pub ip: String,
    pub physical_address: String,
    pub login_type: String,
    pub login_time: DateTime<Utc>,
}

/// Input data for recording a login.
#[derive(Debug, Clone)]
pub struct NewLoginRecord {
    pub user_id: i64,
    pub ip: String,
    pub physical_address: String,
    pub login_type: LoginType,
    pub login_time: DateTime<Utc>,
}
