//! Authentication module for the MedRecords API
//!
//! Provides token handling, password hashing and the middleware that turns a bearer
//! token into an [`AuthenticatedUser`] for the protected routes.

use serde::{Deserialize, Serialize};

#[cfg(feature = "with-axum")]
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "with-axum")]
use tracing::{debug, warn};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

// Token generation and validation
pub mod token;

// Password hashing and policy
pub mod password;

// Include logging module
pub mod logging;

use token::{SecurityError, TokenType};

#[cfg(feature = "with-axum")]
use logging::{log_auth_event, AuthEvent, AuthEventType};
#[cfg(feature = "with-axum")]
use token::TokenService;

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Whether the subject may own patients
    pub is_doctor: bool,
    /// Access or refresh
    pub token_type: TokenType,
    /// Unique token identifier
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

impl Claims {
    /// Numeric user ID carried in `sub`
    pub fn user_id(&self) -> Result<i64, SecurityError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| SecurityError::TokenValidation(format!("Invalid subject: {}", self.sub)))
    }
}

/// Caller identity established by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User ID
    pub user_id: i64,
    /// Doctor flag as of token issue
    pub is_doctor: bool,
}

impl TryFrom<&Claims> for AuthenticatedUser {
    type Error = SecurityError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            is_doctor: claims.is_doctor,
        })
    }
}

/// Body of every 401 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AuthFailure {
    /// Human readable reason
    pub detail: String,
    /// Machine readable reason
    pub code: String,
}

impl AuthFailure {
    fn new(detail: &str, code: &str) -> Self {
        Self {
            detail: detail.to_string(),
            code: code.to_string(),
        }
    }

    /// No usable `Authorization` header
    pub fn not_authenticated() -> Self {
        Self::new("Authentication credentials were not provided.", "not_authenticated")
    }

    /// Token was expired, forged, malformed or of the wrong type
    pub fn invalid_token() -> Self {
        Self::new("Given token not valid for any token type", "token_not_valid")
    }

    /// Login failed; unknown user, wrong password and inactive user look the same
    pub fn no_active_account() -> Self {
        Self::new(
            "No active account found with the given credentials",
            "no_active_account",
        )
    }

    /// Refresh token names a user that no longer exists
    pub fn user_not_found() -> Self {
        Self::new("User not found", "user_not_found")
    }

    /// Refresh token names a deactivated user
    pub fn user_inactive() -> Self {
        Self::new("User is inactive", "user_inactive")
    }
}

#[cfg(feature = "with-axum")]
impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer realm=\"api\"")],
            Json(self),
        )
            .into_response()
    }
}

/// Authentication middleware for protected routes
///
/// Requires `Authorization: Bearer <access token>`. On success the request carries an
/// [`AuthenticatedUser`] and the decoded [`Claims`] as extensions; otherwise the request
/// never reaches the handler and a 401 is returned.
#[cfg(feature = "with-axum")]
pub async fn auth_middleware(
    State(tokens): State<TokenService>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let reject = |user_id: Option<String>, details: String, failure: AuthFailure| {
        let event = AuthEvent::new(AuthEventType::TokenValidation, user_id.as_deref(), false)
            .with_details(details)
            .with_resource(request_path.clone())
            .with_user_agent(user_agent.clone())
            .with_duration(start_time.elapsed().as_millis() as u64)
            .with_auth_method("jwt");
        log_auth_event(event);
        failure.into_response()
    };

    // Extract the token from the Authorization header
    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(auth_str) => auth_str,
            Err(_) => {
                warn!("Invalid Authorization header format");
                return reject(
                    None,
                    "Invalid Authorization header format".to_string(),
                    AuthFailure::not_authenticated(),
                );
            }
        },
        None => {
            debug!("Missing Authorization header");
            return reject(
                None,
                "Missing Authorization header".to_string(),
                AuthFailure::not_authenticated(),
            );
        }
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => {
            warn!("Authorization header does not contain Bearer token");
            return reject(
                None,
                "Authorization header does not contain Bearer token".to_string(),
                AuthFailure::not_authenticated(),
            );
        }
    };

    let claims = match tokens.validate_access(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Rejected bearer token: {}", e);
            return reject(None, e.to_string(), AuthFailure::invalid_token());
        }
    };

    let user = match AuthenticatedUser::try_from(&claims) {
        Ok(user) => user,
        Err(e) => {
            warn!("Rejected bearer token: {}", e);
            return reject(Some(claims.sub.clone()), e.to_string(), AuthFailure::invalid_token());
        }
    };

    debug!("Token validated successfully for user: {}", claims.sub);
    let event = AuthEvent::new(AuthEventType::TokenValidation, Some(&claims.sub), true)
        .with_resource(request_path.clone())
        .with_user_agent(user_agent.clone())
        .with_duration(start_time.elapsed().as_millis() as u64)
        .with_auth_method("jwt");
    log_auth_event(event);

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(claims);

    next.run(req).await
}

/// Configure CORS and security headers for the application
#[cfg(feature = "with-web")]
pub fn configure_auth(app: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, HeaderValue, Method};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    app.layer(cors).layer(security_headers)
}
