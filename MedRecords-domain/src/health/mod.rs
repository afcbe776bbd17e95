//! Domain layer health check functionality
//! This module provides health check services for the application

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::database::DatabasePool;

/// A database round trip slower than this reports the component as degraded
const SLOW_DATABASE_THRESHOLD: Duration = Duration::from_millis(500);

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    /// Overall system status
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check the status of the database
    ///
    /// `Ok(true)` when fully operational, `Ok(false)` when slow, `Err` when unreachable.
    async fn check_database_status(&self) -> Result<bool, String>;
}

/// Health checks against the shared connection pool
#[derive(Debug, Clone)]
pub struct HealthService {
    pool: DatabasePool,
}

impl HealthService {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let db_component = match self.check_database_status().await {
            Ok(true) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(self.pool.connection_info()),
            },
            Ok(false) => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Database is available but responding slowly".to_string()),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e),
            },
        };

        let status = match db_component.status {
            ComponentStatus::Unhealthy => SystemStatus::Unhealthy,
            ComponentStatus::Degraded => SystemStatus::Degraded,
            ComponentStatus::Healthy => SystemStatus::Healthy,
        };

        SystemHealth {
            status,
            components: HashMap::from([("database".to_string(), db_component)]),
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        let started = Instant::now();
        if let Err(e) = self.pool.ping() {
            warn!("Database health check failed: {}", e);
            return Err(format!("Database connection error: {}", e));
        }

        let elapsed = started.elapsed();
        debug!("Database health check took {:?}", elapsed);
        Ok(elapsed < SLOW_DATABASE_THRESHOLD)
    }
}

/// Create a health service for the given pool
pub fn create_health_service(pool: DatabasePool) -> HealthService {
    HealthService::new(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_healthy() {
        let pool = DatabasePool::in_memory().unwrap();
        let health = create_health_service(pool).get_system_health().await;

        assert_eq!(health.status, SystemStatus::Healthy);
        assert_eq!(health.components["database"].status, ComponentStatus::Healthy);
    }
}
