//! Server configuration read from the environment

use std::env;

use thiserror::Error;

use med_records_domain::auth::token::{SecurityError, TokenConfig};
use med_records_domain::database::{DatabaseConfig, DatabaseError};
use med_records_domain::services::ResourceScope;

/// Invalid or missing configuration; the server refuses to start
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT has an invalid value: {0}")]
    Port(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("{0}")]
    Scope(String),
}

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Reported by the health endpoint
    pub environment: String,
    pub scope: ResourceScope,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Port(raw))?,
            Err(_) => 3000,
        };

        Ok(Self {
            port,
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            scope: ResourceScope::from_env().map_err(ConfigError::Scope)?,
            database: DatabaseConfig::from_env()?,
            tokens: TokenConfig::from_env()?,
        })
    }
}
