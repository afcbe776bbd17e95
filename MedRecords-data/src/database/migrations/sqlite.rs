use rusqlite::Connection;
use tracing::info;

use crate::database::DatabaseError;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    create_users_table(conn)?;
    create_patients_table(conn)?;
    create_heart_rates_table(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

/// Create the users table
fn create_users_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating users table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_doctor INTEGER NOT NULL DEFAULT 0,
            is_staff INTEGER NOT NULL DEFAULT 0,
            is_superuser INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            date_joined TEXT NOT NULL
        );",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("users table: {}", e)))
}

/// Create the patients table, owned by a doctor
fn create_patients_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating patients table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER NOT NULL CHECK (age >= 0),
            gender TEXT NOT NULL,
            doctor_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_patients_doctor_id ON patients (doctor_id);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("patients table: {}", e)))
}

/// Create the heart rate readings table, dependent on patients
fn create_heart_rates_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating heart_rates table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS heart_rates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients (id) ON DELETE CASCADE,
            rate INTEGER NOT NULL CHECK (rate >= 0),
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_heart_rates_patient_id ON heart_rates (patient_id);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("heart_rates table: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'patients', 'heart_rates')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
