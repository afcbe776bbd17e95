use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,

    /// Unique login name
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2 PHC string, never the plaintext
    pub password_hash: String,

    /// Whether the account may own patients
    pub is_doctor: bool,

    /// Admin tooling access
    pub is_staff: bool,

    /// Unrestricted admin tooling access
    pub is_superuser: bool,

    /// Inactive accounts cannot authenticate
    pub is_active: bool,

    /// When the account was created
    pub date_joined: DateTime<Utc>,
}

/// Input data for creating a new account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_doctor: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}
