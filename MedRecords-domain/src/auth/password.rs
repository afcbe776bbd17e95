//! Password hashing and strength rules

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

use crate::auth::token::SecurityError;

/// Hash a password into an argon2id PHC string
pub fn hash_password(password: &str) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SecurityError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Rules a new password must satisfy
///
/// Implementations return one message per failed rule, or an empty list.
pub trait PasswordPolicy: Send + Sync {
    fn check(&self, password: &str, username: &str, email: &str) -> Vec<String>;
}

/// Passwords rejected outright by [`DefaultPasswordPolicy`]
const COMMON_PASSWORDS: &[&str] = &[
    "123456", "123456789", "12345678", "1234567890", "password", "password1",
    "password123", "passw0rd", "qwerty", "qwerty123", "qwertyuiop", "abc123",
    "abcd1234", "111111", "000000", "1q2w3e4r", "1qaz2wsx", "iloveyou", "admin",
    "admin123", "administrator", "welcome", "welcome1", "letmein", "monkey",
    "dragon", "sunshine", "princess", "football", "baseball", "superman",
    "trustno1", "master", "shadow", "michael", "jennifer", "hunter2", "starwars",
    "whatever", "freedom", "zaq12wsx", "changeme", "secret", "login", "doctor",
    "hospital", "medicine", "patient", "healthcare", "asdfghjkl",
];

/// Minimum length, not entirely numeric, not common, not similar to the account
#[derive(Debug, Clone)]
pub struct DefaultPasswordPolicy {
    /// Shortest accepted password, in characters
    pub min_length: usize,
    /// Similarity ratio at or above which a password is rejected
    pub max_similarity: f64,
}

impl Default for DefaultPasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_similarity: 0.7,
        }
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn check(&self, password: &str, username: &str, email: &str) -> Vec<String> {
        let mut errors = Vec::new();

        let email_local = email.split('@').next().unwrap_or_default();
        let attributes = [
            ("username", username),
            ("email address", email),
            ("email address", email_local),
        ];
        if let Some((name, _)) = attributes
            .iter()
            .find(|(_, value)| similarity(password, value) >= self.max_similarity)
        {
            errors.push(format!("The password is too similar to the {}.", name));
        }

        if password.chars().count() < self.min_length {
            errors.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }

        let lowered = password.trim().to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            errors.push("This password is too common.".to_string());
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            errors.push("This password is entirely numeric.".to_string());
        }

        errors
    }
}

/// Characters of each side compared by [`similarity`]; longer inputs are truncated
const MAX_SIMILARITY_INPUT: usize = 256;

/// Case-insensitive similarity in `[0, 1]`: twice the longest common subsequence over
/// the combined length
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().take(MAX_SIMILARITY_INPUT).collect();
    let b: Vec<char> = b.to_lowercase().chars().take(MAX_SIMILARITY_INPUT).collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diagonal = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }

    2.0 * row[b.len()] as f64 / (a.len() + b.len()) as f64
}
