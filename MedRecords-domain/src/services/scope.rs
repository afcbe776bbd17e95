use std::env;
use std::fmt;
use std::str::FromStr;

use crate::auth::AuthenticatedUser;

/// Which records a caller can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceScope {
    /// Only records owned by the caller (patients) or by the caller's patients (heart rates)
    #[default]
    Caller,
    /// Every record, regardless of owner
    Global,
}

impl ResourceScope {
    /// Read `RESOURCE_SCOPE`, defaulting to [`ResourceScope::Caller`]
    pub fn from_env() -> Result<Self, String> {
        match env::var("RESOURCE_SCOPE") {
            Ok(raw) => raw.parse(),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Owner filter to pass to the repositories for this caller
    pub fn owner_filter(&self, caller: &AuthenticatedUser) -> Option<i64> {
        match self {
            ResourceScope::Caller => Some(caller.user_id),
            ResourceScope::Global => None,
        }
    }
}

impl FromStr for ResourceScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caller" => Ok(ResourceScope::Caller),
            "global" => Ok(ResourceScope::Global),
            other => Err(format!(
                "RESOURCE_SCOPE must be 'caller' or 'global', got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceScope::Caller => write!(f, "caller"),
            ResourceScope::Global => write!(f, "global"),
        }
    }
}
