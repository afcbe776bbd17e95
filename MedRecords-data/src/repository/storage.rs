//! Helpers shared by the SQLite repositories

use rusqlite::ffi;
use tracing::debug;

use super::errors::RepositoryError;

/// Translate a failed write into a repository error, recognising constraint failures
pub(crate) fn classify_write_error(err: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
        let message = message.clone().unwrap_or_default();

        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                debug!("Unique constraint failed: {}", message);
                return RepositoryError::UniqueViolation {
                    field: constrained_column(&message),
                };
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                debug!("Foreign key constraint failed: {}", message);
                return RepositoryError::ForeignKeyViolation(message);
            }
            ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                return RepositoryError::Validation(message);
            }
            _ => {}
        }
    }

    RepositoryError::Sqlite(err)
}

/// Extract `username` from "UNIQUE constraint failed: users.username"
fn constrained_column(message: &str) -> String {
    message
        .rsplit(|c: char| c == ' ' || c == '.')
        .next()
        .filter(|column| !column.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Render `?1, ?2, ...` placeholders for an `IN (...)` clause
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
