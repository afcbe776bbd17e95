use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for a heart rate reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRate {
    /// Unique identifier
    pub id: i64,

    /// Patient the reading belongs to
    pub patient_id: i64,

    /// Beats per minute
    pub rate: u32,

    /// Assigned by the repository when the row is inserted
    pub recorded_at: DateTime<Utc>,
}

/// Input data for creating a new heart rate reading
///
/// `recorded_at` is always the insert time, so it is not part of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHeartRate {
    pub patient_id: i64,
    pub rate: u32,
}
