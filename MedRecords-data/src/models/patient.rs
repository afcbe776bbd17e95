use serde::{Deserialize, Serialize};

/// Storage model for a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Unique identifier
    pub id: i64,

    /// Full name
    pub name: String,

    /// Age in years
    pub age: u32,

    /// Free-form gender label
    pub gender: String,

    /// Owning doctor (user id)
    pub doctor_id: i64,
}

/// Input data for creating a new patient, already stamped with its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub doctor_id: i64,
}
