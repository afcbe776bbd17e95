// Domain services
// This module contains business logic implementations.

pub mod bulk;
pub mod errors;
pub mod heart_rate;
pub mod identity;
pub mod patient;
pub mod scope;

// Re-export service traits and factory functions
pub use bulk::{create_with_hook, FieldErrors, Payload, ValidationFailure};
pub use errors::ServiceError;
pub use heart_rate::{create_heart_rate_service, HeartRateService, HeartRateServiceTrait};
pub use identity::{create_identity_service, IdentityService, IdentityServiceTrait};
pub use patient::{create_patient_service, PatientService, PatientServiceTrait};
pub use scope::ResourceScope;
