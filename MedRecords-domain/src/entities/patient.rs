use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::validation::not_blank;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A patient as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Patient {
    /// Unique identifier
    pub id: i64,

    /// Full name
    pub name: String,

    /// Age in years
    pub age: u32,

    /// Free-form gender label
    pub gender: String,

    /// ID of the owning doctor; always the doctor who created the record
    pub doctor: i64,
}

/// Request payload for creating a patient
///
/// A `doctor` field in the body is ignored; the owner is the authenticated caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreatePatientRequest {
    /// Full name
    #[validate(required, length(max = 255), custom = "not_blank")]
    pub name: Option<String>,

    /// Age in years
    #[validate(required, range(min = 0))]
    pub age: Option<i32>,

    /// Free-form gender label
    #[validate(required, length(max = 10), custom = "not_blank")]
    pub gender: Option<String>,
}
