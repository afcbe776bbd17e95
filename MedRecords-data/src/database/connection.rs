//! Database connection module for the MedRecords application
//!
//! Provides the pooled SQLite connection used by every repository. Each pooled
//! connection enables foreign key enforcement so that deleting a user cascades to
//! their patients and, through them, to heart rate readings.

use std::env;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;
use tracing::{error, info};

use crate::database::migrations::run_sqlite_migrations;

/// Path value that selects an in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Pooled SQLite connection handed out by [`DatabasePool::get`]
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database error
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    SqlitePoolError(#[from] r2d2::Error),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),

    /// Filesystem error while preparing the database location
    #[error("Database path error: {0}")]
    PathError(#[from] std::io::Error),
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection checkout timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/med_records.db".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: IN_MEMORY_PATH.to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let defaults = Self::default();

        let sqlite_path = env::var("DB_SQLITE_PATH").unwrap_or(defaults.sqlite_path);
        let max_connections = parse_env("DB_MAX_CONNECTIONS", defaults.max_connections)?;
        let timeout_seconds = parse_env("DB_TIMEOUT_SECONDS", defaults.timeout_seconds)?;

        if max_connections == 0 {
            return Err(DatabaseError::ConfigError(
                "DB_MAX_CONNECTIONS must be greater than zero".to_string(),
            ));
        }

        info!(
            "Database configuration: path={}, max_connections={}, timeout={}s",
            sqlite_path, max_connections, timeout_seconds
        );

        Ok(Self {
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }

    /// Whether this configuration points at an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.sqlite_path == IN_MEMORY_PATH
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, DatabaseError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| DatabaseError::ConfigError(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Shared SQLite connection pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: Arc<r2d2::Pool<SqliteConnectionManager>>,
    location: String,
}

impl fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabasePool")
            .field("location", &self.location)
            .field("max_size", &self.pool.max_size())
            .finish()
    }
}

impl DatabasePool {
    /// Open the pool described by `config` and bring the schema up to date
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let manager = if config.is_in_memory() {
            info!("Initializing in-memory SQLite database");
            SqliteConnectionManager::memory()
        } else {
            info!("Initializing SQLite database at: {}", config.sqlite_path);
            ensure_parent_dir(&config.sqlite_path)?;
            SqliteConnectionManager::file(&config.sqlite_path)
                .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
        };

        // Every in-memory connection is its own database, so the pool is pinned to one
        let max_size = if config.is_in_memory() { 1 } else { config.max_connections };

        let manager = manager.with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });

        let mut builder = r2d2::Pool::builder()
            .max_size(max_size)
            .connection_timeout(Duration::from_secs(config.timeout_seconds));

        if config.is_in_memory() {
            // Recycling the only connection would discard the whole database
            builder = builder.idle_timeout(None).max_lifetime(None);
        }

        let pool = builder
            .build(manager)
            .map_err(|e| {
                error!("Failed to create SQLite connection pool: {}", e);
                DatabaseError::SqlitePoolError(e)
            })?;

        let pool = Self {
            pool: Arc::new(pool),
            location: config.sqlite_path.clone(),
        };

        pool.migrate()?;
        info!("SQLite connection pool created successfully");

        Ok(pool)
    }

    /// Open a fresh, migrated in-memory database
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::connect(&DatabaseConfig::in_memory())
    }

    /// Check out a connection
    pub fn get(&self) -> Result<PooledConnection, DatabaseError> {
        Ok(self.pool.get()?)
    }

    /// Run a trivial query to confirm the database answers
    pub fn ping(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Human readable description of the pool for health reporting
    pub fn connection_info(&self) -> String {
        let state = self.pool.state();
        let location = if self.location == IN_MEMORY_PATH {
            "SQLite in-memory database".to_string()
        } else {
            format!("SQLite database at {}", self.location)
        };

        format!(
            "{} (connections: open={}, idle={})",
            location, state.connections, state.idle_connections
        )
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        run_sqlite_migrations(&conn)
    }
}

fn ensure_parent_dir(sqlite_path: &str) -> Result<(), DatabaseError> {
    if let Some(parent) = Path::new(sqlite_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
