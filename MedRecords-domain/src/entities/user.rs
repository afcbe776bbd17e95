use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::validation::{not_blank, valid_username};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Account details safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PublicUser {
    /// Unique identifier
    pub id: i64,
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Whether the account may own patients
    pub is_doctor: bool,
}

/// Registration payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RegisterRequest {
    /// Letters, digits and @/./+/-/_ only
    #[validate(required, length(max = 150), custom = "valid_username")]
    pub username: Option<String>,

    /// Email address, unique across accounts
    #[validate(required, length(max = 254), custom = "not_blank", email)]
    pub email: Option<String>,

    /// New password
    #[validate(required, length(max = 128), custom = "not_blank")]
    pub password: Option<String>,

    /// Must repeat `password`
    #[validate(required, length(max = 128), custom = "not_blank")]
    pub password2: Option<String>,

    /// Defaults to false
    #[serde(default)]
    pub is_doctor: bool,
}

/// Login payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginRequest {
    #[validate(required, custom = "not_blank")]
    pub username: Option<String>,

    #[validate(required, custom = "not_blank")]
    pub password: Option<String>,
}

/// Refresh payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RefreshRequest {
    /// Refresh token issued by login
    #[validate(required, custom = "not_blank")]
    pub refresh: Option<String>,
}
