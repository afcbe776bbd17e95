use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::errors::RepositoryError;
use super::storage::classify_write_error;
use crate::database::DatabasePool;
use crate::models::user::{NewUser, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_doctor, is_staff, is_superuser, is_active, date_joined";

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Insert a new account
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Get an account by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    /// Get an account by its exact username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Whether the username is taken
    async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError>;

    /// Whether the email is taken (case-insensitive)
    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError>;

    /// Mark an account active or inactive
    async fn set_active(&self, id: i64, active: bool) -> Result<(), RepositoryError>;

    /// Delete an account together with everything it owns
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

/// SQLite-backed user repository
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DatabasePool,
}

impl UserRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_doctor: row.get(4)?,
        is_staff: row.get(5)?,
        is_superuser: row.get(6)?,
        is_active: row.get(7)?,
        date_joined: row.get(8)?,
    })
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let date_joined = Utc::now();

        conn.execute(
            "INSERT INTO users
             (username, email, password_hash, is_doctor, is_staff, is_superuser, is_active, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.is_doctor,
                user.is_staff,
                user.is_superuser,
                date_joined,
            ],
        )
        .map_err(classify_write_error)?;

        let id = conn.last_insert_rowid();
        info!("Created user {} with id {}", user.username, id);

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_doctor: user.is_doctor,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: true,
            date_joined,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        debug!("Getting user by ID: {}", id);
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                [id],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        debug!("Getting user by username: {}", username);
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                [username],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = ?1)",
            [username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower(?1))",
            [email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE users SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;

        if deleted > 0 {
            info!("Deleted user {} and cascaded to owned records", id);
        }
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            is_doctor: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());

        let created = repo.create(new_user("doctor1", "doctor1@test.com")).await.unwrap();
        assert_eq!(created.id, 1);
        assert!(created.is_active);

        let by_name = repo.get_by_username("doctor1").await.unwrap().unwrap();
        assert_eq!(by_name, created);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "doctor1@test.com");

        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
        assert!(repo.username_exists("doctor1").await.unwrap());
        assert!(repo.email_exists("DOCTOR1@test.com").await.unwrap());
        assert!(!repo.email_exists("other@test.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());
        repo.create(new_user("doctor1", "a@test.com")).await.unwrap();

        let err = repo.create(new_user("doctor1", "b@test.com")).await.unwrap_err();
        match err {
            RepositoryError::UniqueViolation { field } => assert_eq!(field, "username"),
            other => panic!("expected unique violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_active_and_delete() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());
        let user = repo.create(new_user("doctor1", "a@test.com")).await.unwrap();

        repo.set_active(user.id, false).await.unwrap();
        assert!(!repo.get_by_id(user.id).await.unwrap().unwrap().is_active);

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(matches!(
            repo.set_active(user.id, true).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
