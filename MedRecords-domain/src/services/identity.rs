use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use validator::Validate;

use med_records_data::database::DatabasePool;
use med_records_data::models::NewUser;
use med_records_data::repository::{RepositoryError, UserRepository, UserRepositoryTrait};

use crate::auth::logging::{
    log_auth_event, log_failed_login, log_registration, log_successful_login, log_token_refresh,
    AuthEvent, AuthEventType,
};
use crate::auth::password::{hash_password, verify_password, DefaultPasswordPolicy, PasswordPolicy};
use crate::auth::token::{AccessToken, TokenPair, TokenService, TokenType};
use crate::auth::AuthFailure;
use crate::entities::conversions;
use crate::entities::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
use crate::services::bulk::{field_errors, FieldErrors, ValidationFailure};
use crate::services::ServiceError;

/// Trait for account and credential operations
#[async_trait]
pub trait IdentityServiceTrait: Send + Sync {
    /// Create an account
    async fn register(&self, request: RegisterRequest) -> Result<PublicUser, ServiceError>;

    /// Check a username and password against an active account
    async fn authenticate(&self, username: &str, password: &str) -> Result<PublicUser, ServiceError>;

    /// Authenticate and issue an access/refresh token pair
    async fn login(&self, request: LoginRequest) -> Result<TokenPair, ServiceError>;

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, request: RefreshRequest) -> Result<AccessToken, ServiceError>;
}

/// Identity service backed by the user repository
pub struct IdentityService {
    users: Arc<dyn UserRepositoryTrait>,
    tokens: TokenService,
    policy: Arc<dyn PasswordPolicy>,
}

impl IdentityService {
    /// Create a new identity service
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        tokens: TokenService,
        policy: Arc<dyn PasswordPolicy>,
    ) -> Self {
        Self {
            users,
            tokens,
            policy,
        }
    }

    /// Every field error for a registration, including a password confirmation mismatch
    async fn registration_errors(&self, request: &RegisterRequest) -> Result<FieldErrors, ServiceError> {
        let mut errors = match request.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => field_errors(&e),
        };

        if let Some(username) = request.username.as_deref() {
            if !errors.contains_key("username") && self.users.username_exists(username).await? {
                errors
                    .entry("username".to_string())
                    .or_default()
                    .push("A user with that username already exists.".to_string());
            }
        }

        if let Some(email) = request.email.as_deref() {
            if !errors.contains_key("email") && self.users.email_exists(&normalize_email(email)).await? {
                errors
                    .entry("email".to_string())
                    .or_default()
                    .push("A user with that email already exists.".to_string());
            }
        }

        if let Some(password) = request.password.clone() {
            if !errors.contains_key("password") {
                // Attributes that failed their own rules are not compared against
                let attribute = |field: &str, value: &Option<String>| {
                    if errors.contains_key(field) {
                        String::new()
                    } else {
                        value.clone().unwrap_or_default()
                    }
                };
                let username = attribute("username", &request.username);
                let email = attribute("email", &request.email);

                let policy = Arc::clone(&self.policy);
                let problems = tokio::task::spawn_blocking(move || policy.check(&password, &username, &email))
                    .await
                    .map_err(|e| ServiceError::Unexpected(format!("Password policy task failed: {}", e)))?;
                if !problems.is_empty() {
                    errors.insert("password".to_string(), problems);
                }
            }
        }

        if let (Some(password), Some(password2)) = (&request.password, &request.password2) {
            if password != password2 {
                errors
                    .entry("password".to_string())
                    .or_default()
                    .push("Password fields didn't match.".to_string());
            }
        }

        Ok(errors)
    }
}

/// Lowercase the domain part of an email address
fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    value.ok_or_else(|| ServiceError::Validation(ValidationFailure::field(field, "This field is required.")))
}

#[async_trait]
impl IdentityServiceTrait for IdentityService {
    async fn register(&self, request: RegisterRequest) -> Result<PublicUser, ServiceError> {
        let attempted = request.username.clone().unwrap_or_default();

        let errors = self.registration_errors(&request).await?;
        if !errors.is_empty() {
            log_registration(&attempted, false, Some("field validation failed"));
            return Err(ServiceError::Validation(ValidationFailure::Single(errors)));
        }

        let username = required(request.username, "username")?;
        let email = normalize_email(&required(request.email, "email")?);
        let password = required(request.password, "password")?;

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| ServiceError::Unexpected(e.to_string()))?;

        let created = self
            .users
            .create(NewUser {
                username: username.clone(),
                email,
                password_hash,
                is_doctor: request.is_doctor,
                is_staff: false,
                is_superuser: false,
            })
            .await;

        match created {
            Ok(user) => {
                log_registration(&user.username, true, None);
                Ok(conversions::convert_to_public_user(user))
            }
            Err(RepositoryError::UniqueViolation { field }) => {
                log_registration(&username, false, Some("unique constraint race"));
                Err(ServiceError::Validation(ValidationFailure::field(
                    &field,
                    format!("A user with that {} already exists.", field),
                )))
            }
            Err(e) => {
                log_registration(&username, false, Some("storage failure"));
                Err(e.into())
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<PublicUser, ServiceError> {
        let rejected = || ServiceError::Authentication(AuthFailure::no_active_account());

        let user = match self.users.get_by_username(username).await? {
            Some(user) => user,
            None => {
                log_failed_login(username, "unknown username");
                return Err(rejected());
            }
        };

        let hash = user.password_hash.clone();
        let candidate = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Password verification task failed: {}", e)))?;

        if !matches {
            log_failed_login(username, "wrong password");
            return Err(rejected());
        }
        if !user.is_active {
            log_failed_login(username, "inactive account");
            return Err(rejected());
        }

        log_successful_login(&user.id.to_string());
        Ok(conversions::convert_to_public_user(user))
    }

    async fn login(&self, request: LoginRequest) -> Result<TokenPair, ServiceError> {
        if let Err(e) = request.validate() {
            return Err(ServiceError::Validation(ValidationFailure::Single(field_errors(&e))));
        }

        let username = required(request.username, "username")?;
        let password = required(request.password, "password")?;

        let user = self.authenticate(&username, &password).await?;
        let pair = self
            .tokens
            .issue_pair(user.id, user.is_doctor)
            .map_err(|e| ServiceError::Unexpected(e.to_string()))?;

        info!("Issued token pair for user {}", user.id);
        Ok(pair)
    }

    async fn refresh(&self, request: RefreshRequest) -> Result<AccessToken, ServiceError> {
        if let Err(e) = request.validate() {
            return Err(ServiceError::Validation(ValidationFailure::Single(field_errors(&e))));
        }
        let token = required(request.refresh, "refresh")?;

        let claims = match self.tokens.validate_refresh(&token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Refresh token rejected: {}", e);
                log_token_refresh("unknown", false, Some(&e.to_string()));
                return Err(ServiceError::Authentication(AuthFailure::invalid_token()));
            }
        };

        let user_id = claims
            .user_id()
            .map_err(|_| ServiceError::Authentication(AuthFailure::invalid_token()))?;

        let user = match self.users.get_by_id(user_id).await? {
            Some(user) => user,
            None => {
                log_token_refresh(&claims.sub, false, Some("user no longer exists"));
                return Err(ServiceError::Authentication(AuthFailure::user_not_found()));
            }
        };
        if !user.is_active {
            log_token_refresh(&claims.sub, false, Some("user is inactive"));
            return Err(ServiceError::Authentication(AuthFailure::user_inactive()));
        }

        let access = self
            .tokens
            .generate(user.id, user.is_doctor, TokenType::Access)
            .map_err(|e| {
                warn!("Could not mint access token: {}", e);
                ServiceError::Unexpected(e.to_string())
            })?;

        log_auth_event(
            AuthEvent::new(AuthEventType::TokenRefresh, Some(&claims.sub), true)
                .with_details(format!("is_doctor={}", user.is_doctor)),
        );
        Ok(AccessToken { access })
    }
}

/// Create an identity service with the default password policy
pub fn create_identity_service(pool: DatabasePool, tokens: TokenService) -> IdentityService {
    IdentityService::new(
        Arc::new(UserRepository::new(pool)),
        tokens,
        Arc::new(DefaultPasswordPolicy::default()),
    )
}
