//! Identity and credential exchange payloads.

use serde::{Deserialize, Serialize};

/// Role id the backend treats as the administrator role.
pub const ADMIN_ROLE_ID: i64 = 1;

/// The signed-in user as returned by `GET /api/users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub profile_complete: bool,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Whether this user holds the administrator role.
    pub fn is_admin(&self) -> bool {
        self.role_id == Some(ADMIN_ROLE_ID)
    }

    /// Full name if set, otherwise the username.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}
