// Storage models
pub mod heart_rate;
pub mod patient;
pub mod user;

pub use heart_rate::{HeartRate, NewHeartRate};
pub use patient::{NewPatient, Patient};
pub use user::{NewUser, User};
