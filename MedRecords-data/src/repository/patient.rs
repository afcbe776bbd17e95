use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::{debug, info};

use super::errors::RepositoryError;
use super::storage::{classify_write_error, placeholders};
use crate::database::DatabasePool;
use crate::models::patient::{NewPatient, Patient};

/// Repository trait for patients
///
/// Read operations take an optional `doctor_id`. `Some(id)` restricts the result to
/// patients owned by that doctor, `None` reads across all owners.
#[async_trait]
pub trait PatientRepositoryTrait: Send + Sync {
    /// Insert every patient in one transaction; nothing is written if any insert fails
    async fn create_many(&self, patients: Vec<NewPatient>) -> Result<Vec<Patient>, RepositoryError>;

    /// List patients ordered by ID
    async fn list(&self, doctor_id: Option<i64>) -> Result<Vec<Patient>, RepositoryError>;

    /// Get a patient by ID
    async fn get_by_id(&self, id: i64, doctor_id: Option<i64>) -> Result<Option<Patient>, RepositoryError>;

    /// Return the subset of `ids` that exist (and are owned by `doctor_id`, when given)
    async fn existing_ids(&self, ids: &[i64], doctor_id: Option<i64>) -> Result<Vec<i64>, RepositoryError>;

    /// Delete a patient and its heart rate readings
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

/// Ids bound per `existing_ids` query, well under SQLite's host parameter limit
const EXISTING_IDS_CHUNK: usize = 500;

/// SQLite-backed patient repository
#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: DatabasePool,
}

impl PatientRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        doctor_id: row.get(4)?,
    })
}

#[async_trait]
impl PatientRepositoryTrait for PatientRepository {
    async fn create_many(&self, patients: Vec<NewPatient>) -> Result<Vec<Patient>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let mut created = Vec::with_capacity(patients.len());
        for patient in patients {
            tx.execute(
                "INSERT INTO patients (name, age, gender, doctor_id) VALUES (?1, ?2, ?3, ?4)",
                params![patient.name, patient.age, patient.gender, patient.doctor_id],
            )
            .map_err(classify_write_error)?;

            created.push(Patient {
                id: tx.last_insert_rowid(),
                name: patient.name,
                age: patient.age,
                gender: patient.gender,
                doctor_id: patient.doctor_id,
            });
        }

        tx.commit()?;
        info!("Stored {} patient(s)", created.len());

        Ok(created)
    }

    async fn list(&self, doctor_id: Option<i64>) -> Result<Vec<Patient>, RepositoryError> {
        debug!("Listing patients for doctor {:?}", doctor_id);
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, age, gender, doctor_id FROM patients
             WHERE (?1 IS NULL OR doctor_id = ?1)
             ORDER BY id",
        )?;

        let patients = stmt
            .query_map([doctor_id], row_to_patient)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    async fn get_by_id(&self, id: i64, doctor_id: Option<i64>) -> Result<Option<Patient>, RepositoryError> {
        debug!("Getting patient {} for doctor {:?}", id, doctor_id);
        let conn = self.pool.get()?;

        let patient = conn
            .query_row(
                "SELECT id, name, age, gender, doctor_id FROM patients
                 WHERE id = ?1 AND (?2 IS NULL OR doctor_id = ?2)",
                params![id, doctor_id],
                row_to_patient,
            )
            .optional()?;

        Ok(patient)
    }

    async fn existing_ids(&self, ids: &[i64], doctor_id: Option<i64>) -> Result<Vec<i64>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let mut found: Vec<i64> = Vec::new();

        for chunk in ids.chunks(EXISTING_IDS_CHUNK) {
            let owner_param = chunk.len() + 1;
            let sql = format!(
                "SELECT id FROM patients WHERE id IN ({}) AND (?{owner} IS NULL OR doctor_id = ?{owner})",
                placeholders(chunk.len()),
                owner = owner_param,
            );

            let mut values: Vec<Option<i64>> = chunk.iter().copied().map(Some).collect();
            values.push(doctor_id);

            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
            for id in rows {
                found.push(id?);
            }
        }

        debug!("{} of {} patient id(s) found", found.len(), ids.len());
        Ok(found)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}
