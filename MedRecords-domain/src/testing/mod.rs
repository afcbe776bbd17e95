// Testing utilities for the domain layer
// This module is only available in unit tests or when the "mock" feature is enabled

use std::sync::OnceLock;

use med_records_data::database::DatabasePool;
use med_records_data::models::NewUser;
use med_records_data::repository::{UserRepository, UserRepositoryTrait};

use crate::auth::password::hash_password;
use crate::auth::token::{TokenConfig, TokenService};
use crate::auth::AuthenticatedUser;
use crate::health::{create_health_service, HealthService};
use crate::services::{
    create_heart_rate_service, create_identity_service, create_patient_service, HeartRateService,
    IdentityService, PatientService, ResourceScope,
};

/// Signing key used by every test token service
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-only-used-in-tests";

/// Password that satisfies the default password policy
pub const TEST_PASSWORD: &str = "Vicodin-Cane-2004";

static TEST_PASSWORD_HASH: OnceLock<String> = OnceLock::new();

/// Argon2 hash of [`TEST_PASSWORD`], computed once per test binary
pub fn test_password_hash() -> String {
    TEST_PASSWORD_HASH
        .get_or_init(|| hash_password(TEST_PASSWORD).expect("hash test password"))
        .clone()
}

/// A fresh in-memory database plus a token service, shared by the services under test
pub struct TestContext {
    pub pool: DatabasePool,
    pub tokens: TokenService,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Create a context with its own migrated in-memory database
    pub fn new() -> Self {
        Self {
            pool: DatabasePool::in_memory().expect("in-memory database"),
            tokens: TokenService::new(TokenConfig::new(TEST_JWT_SECRET)),
        }
    }

    /// Insert an active account whose password is [`TEST_PASSWORD`]
    pub async fn create_user(&self, username: &str, is_doctor: bool) -> AuthenticatedUser {
        let user = UserRepository::new(self.pool.clone())
            .create(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: test_password_hash(),
                is_doctor,
                is_staff: false,
                is_superuser: false,
            })
            .await
            .expect("create test user");

        AuthenticatedUser {
            user_id: user.id,
            is_doctor: user.is_doctor,
        }
    }

    /// Mark an account inactive
    pub async fn deactivate(&self, user_id: i64) {
        UserRepository::new(self.pool.clone())
            .set_active(user_id, false)
            .await
            .expect("deactivate test user");
    }

    /// Bearer value for an access token belonging to `user`
    pub fn bearer(&self, user: &AuthenticatedUser) -> String {
        let pair = self
            .tokens
            .issue_pair(user.user_id, user.is_doctor)
            .expect("issue test tokens");
        format!("Bearer {}", pair.access)
    }

    pub fn patient_service(&self, scope: ResourceScope) -> PatientService {
        create_patient_service(self.pool.clone(), scope)
    }

    pub fn heart_rate_service(&self, scope: ResourceScope) -> HeartRateService {
        create_heart_rate_service(self.pool.clone(), scope)
    }

    pub fn identity_service(&self) -> IdentityService {
        create_identity_service(self.pool.clone(), self.tokens.clone())
    }

    pub fn health_service(&self) -> HealthService {
        create_health_service(self.pool.clone())
    }
}
