// API layer: routing, handlers and error envelopes
pub mod error;
pub mod handlers;
pub mod routes;

pub use routes::{create_app, AppState};
