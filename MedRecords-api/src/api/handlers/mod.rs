pub mod auth;
pub mod health;
pub mod heart_rates;
pub mod patients;

pub use health::health_check;

use crate::api::error::ApiError;

/// Parse a path id; anything that is not an integer simply matches no record
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::NotFound)
}
