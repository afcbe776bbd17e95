use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A heart rate reading as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HeartRate {
    /// Unique identifier
    pub id: i64,

    /// ID of the patient the reading belongs to
    pub patient: i64,

    /// Beats per minute
    pub rate: u32,

    /// Server-assigned creation time (RFC 3339, UTC)
    pub recorded_at: DateTime<Utc>,
}

/// Request payload for recording a heart rate
///
/// Any `recorded_at` in the body is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateHeartRateRequest {
    /// ID of an existing patient
    #[validate(required)]
    pub patient: Option<i64>,

    /// Beats per minute
    #[validate(required, range(min = 0))]
    pub rate: Option<i32>,
}
