use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::errors::RepositoryError;
use super::storage::classify_write_error;
use crate::database::DatabasePool;
use crate::models::heart_rate::{HeartRate, NewHeartRate};

/// Repository trait for heart rate readings
///
/// Readings have no owner column of their own; a `doctor_id` filter applies to the
/// doctor who owns the reading's patient.
#[async_trait]
pub trait HeartRateRepositoryTrait: Send + Sync {
    /// Insert every reading in one transaction, stamping each with the current time
    async fn create_many(&self, readings: Vec<NewHeartRate>) -> Result<Vec<HeartRate>, RepositoryError>;

    /// List readings ordered by ID
    async fn list(&self, doctor_id: Option<i64>) -> Result<Vec<HeartRate>, RepositoryError>;

    /// Get a reading by ID
    async fn get_by_id(&self, id: i64, doctor_id: Option<i64>) -> Result<Option<HeartRate>, RepositoryError>;
}

/// SQLite-backed heart rate repository
#[derive(Debug, Clone)]
pub struct HeartRateRepository {
    pool: DatabasePool,
}

impl HeartRateRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_heart_rate(row: &Row<'_>) -> rusqlite::Result<HeartRate> {
    Ok(HeartRate {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        rate: row.get(2)?,
        recorded_at: row.get(3)?,
    })
}

#[async_trait]
impl HeartRateRepositoryTrait for HeartRateRepository {
    async fn create_many(&self, readings: Vec<NewHeartRate>) -> Result<Vec<HeartRate>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let mut created = Vec::with_capacity(readings.len());
        for reading in readings {
            let recorded_at = Utc::now();
            tx.execute(
                "INSERT INTO heart_rates (patient_id, rate, recorded_at) VALUES (?1, ?2, ?3)",
                params![reading.patient_id, reading.rate, recorded_at],
            )
            .map_err(classify_write_error)?;

            created.push(HeartRate {
                id: tx.last_insert_rowid(),
                patient_id: reading.patient_id,
                rate: reading.rate,
                recorded_at,
            });
        }

        tx.commit()?;
        info!("Stored {} heart rate reading(s)", created.len());

        Ok(created)
    }

    async fn list(&self, doctor_id: Option<i64>) -> Result<Vec<HeartRate>, RepositoryError> {
        debug!("Listing heart rates for doctor {:?}", doctor_id);
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT h.id, h.patient_id, h.rate, h.recorded_at
             FROM heart_rates h
             JOIN patients p ON p.id = h.patient_id
             WHERE (?1 IS NULL OR p.doctor_id = ?1)
             ORDER BY h.id",
        )?;

        let readings = stmt
            .query_map([doctor_id], row_to_heart_rate)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    async fn get_by_id(&self, id: i64, doctor_id: Option<i64>) -> Result<Option<HeartRate>, RepositoryError> {
        debug!("Getting heart rate {} for doctor {:?}", id, doctor_id);
        let conn = self.pool.get()?;

        let reading = conn
            .query_row(
                "SELECT h.id, h.patient_id, h.rate, h.recorded_at
                 FROM heart_rates h
                 JOIN patients p ON p.id = h.patient_id
                 WHERE h.id = ?1 AND (?2 IS NULL OR p.doctor_id = ?2)",
                params![id, doctor_id],
                row_to_heart_rate,
            )
            .optional()?;

        Ok(reading)
    }
}
