// MedRecords-api lib.rs
//
// This is the main library file for the MedRecords API.
// It re-exports the router and configuration used by the server binary and the tests.

pub mod api;
pub mod config;
pub mod entities;
pub mod openapi;

pub use api::{create_app, AppState};
pub use config::{AppConfig, ConfigError};
