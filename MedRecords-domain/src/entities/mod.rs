// Domain entities and request payloads
pub mod conversions;
pub mod heart_rate;
pub mod patient;
pub mod user;
pub mod validation;

// Re-export common types for easier imports
pub use heart_rate::{CreateHeartRateRequest, HeartRate};
pub use patient::{CreatePatientRequest, Patient};
pub use user::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
