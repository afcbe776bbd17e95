// Repository module structure
pub mod errors;
mod heart_rate;
mod patient;
mod storage;
mod user;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use heart_rate::{HeartRateRepository, HeartRateRepositoryTrait};
pub use patient::{PatientRepository, PatientRepositoryTrait};
pub use user::{UserRepository, UserRepositoryTrait};
