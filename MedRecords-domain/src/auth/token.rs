use std::env;
use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::Claims;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Default `iss` claim
pub const DEFAULT_ISSUER: &str = "med-records-api";

/// Security errors for authentication and token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Token is valid but of the wrong kind for this use
    #[error("Token has wrong type: expected {expected}, got {actual}")]
    WrongTokenType {
        expected: TokenType,
        actual: TokenType,
    },

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),

    /// Password hashing failed
    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// Access and refresh tokens returned by login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct TokenPair {
    /// JWT access token
    pub access: String,
    /// JWT refresh token
    pub refresh: String,
}

/// Access token minted from a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AccessToken {
    /// JWT access token
    pub access: String,
}

/// Signing key and lifetimes for issued tokens
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret
    pub secret: String,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Access token lifetime
    pub access_lifetime: Duration,
    /// Refresh token lifetime
    pub refresh_lifetime: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .finish()
    }
}

impl TokenConfig {
    /// Config with the default issuer and lifetimes (5 minutes / 1 day)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_lifetime: Duration::minutes(5),
            refresh_lifetime: Duration::days(1),
        }
    }

    /// Load the token configuration from environment variables
    ///
    /// `JWT_SECRET` is required. `JWT_ISSUER`, `ACCESS_TOKEN_LIFETIME_MINUTES` and
    /// `REFRESH_TOKEN_LIFETIME_DAYS` fall back to their defaults when unset.
    pub fn from_env() -> Result<Self, SecurityError> {
        let secret = env::var("JWT_SECRET").map_err(|e| {
            error!("JWT_SECRET environment variable not found: {}", e);
            SecurityError::ConfigError("JWT_SECRET environment variable not found".to_string())
        })?;

        if secret.is_empty() {
            return Err(SecurityError::ConfigError("JWT_SECRET must not be empty".to_string()));
        }

        let mut config = Self::new(secret);

        if let Ok(issuer) = env::var("JWT_ISSUER") {
            config.issuer = issuer;
        }
        if let Some(minutes) = positive_env("ACCESS_TOKEN_LIFETIME_MINUTES")? {
            config.access_lifetime =
                checked_lifetime("ACCESS_TOKEN_LIFETIME_MINUTES", minutes, Duration::try_minutes)?;
        }
        if let Some(days) = positive_env("REFRESH_TOKEN_LIFETIME_DAYS")? {
            config.refresh_lifetime =
                checked_lifetime("REFRESH_TOKEN_LIFETIME_DAYS", days, Duration::try_days)?;
        }

        info!(
            "Token configuration: issuer={}, access={}m, refresh={}d",
            config.issuer,
            config.access_lifetime.num_minutes(),
            config.refresh_lifetime.num_days()
        );

        Ok(config)
    }

    fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        }
    }
}

fn positive_env(name: &str) -> Result<Option<i64>, SecurityError> {
    match env::var(name) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => Err(SecurityError::ConfigError(format!(
                "{} must be a positive integer, got {}",
                name, raw
            ))),
        },
        Err(_) => Ok(None),
    }
}

/// Convert a configured lifetime, rejecting values that cannot be added to the current time
fn checked_lifetime(name: &str, value: i64, unit: fn(i64) -> Option<Duration>) -> Result<Duration, SecurityError> {
    unit(value)
        .filter(|lifetime| Utc::now().checked_add_signed(*lifetime).is_some())
        .ok_or_else(|| SecurityError::ConfigError(format!("{} is out of range, got {}", name, value)))
}

/// Issues and validates HS256 tokens
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService").field("config", &self.config).finish()
    }
}

impl TokenService {
    /// Create a token service from its configuration
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Token configuration in use
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Generate a signed token of the given type for a user
    pub fn generate(
        &self,
        user_id: i64,
        is_doctor: bool,
        token_type: TokenType,
    ) -> Result<String, SecurityError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.config.lifetime(token_type))
            .ok_or_else(|| SecurityError::ConfigError(format!("{} token lifetime is out of range", token_type)))?;

        let claims = Claims {
            sub: user_id.to_string(),
            is_doctor,
            token_type,
            jti: Uuid::new_v4().to_string(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to encode JWT token: {}", e);
            SecurityError::TokenValidation(e.to_string())
        })?;

        // Log token generation (but not the token itself)
        info!("Generated {} token for user {}", token_type, user_id);
        debug!("Token expiration: {}", expiration);

        Ok(token)
    }

    /// Issue an access and refresh token pair
    pub fn issue_pair(&self, user_id: i64, is_doctor: bool) -> Result<TokenPair, SecurityError> {
        Ok(TokenPair {
            access: self.generate(user_id, is_doctor, TokenType::Access)?,
            refresh: self.generate(user_id, is_doctor, TokenType::Refresh)?,
        })
    }

    /// Validate a token and require it to be of `expected` type
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    SecurityError::TokenValidation("Invalid signature".to_string())
                }
                _ => SecurityError::TokenValidation(e.to_string()),
            }
        })?;

        let claims = token_data.claims;
        if claims.token_type != expected {
            return Err(SecurityError::WrongTokenType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }

    /// Validate a bearer token; refresh tokens are rejected
    pub fn validate_access(&self, token: &str) -> Result<Claims, SecurityError> {
        self.validate(token, TokenType::Access)
    }

    /// Validate a refresh token; access tokens are rejected
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, SecurityError> {
        self.validate(token, TokenType::Refresh)
    }
}
