use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use med_records_domain::auth::token::{AccessToken, TokenPair};
use med_records_domain::auth::AuthFailure;
use med_records_domain::entities::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest};

use crate::api::error::{ApiError, ApiJson};
use crate::api::routes::AppState;
use crate::entities::common::ValidationErrorResponse;

/// Create an account
#[utoipa::path(
    post,
    path = "/register/",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = PublicUser),
        (status = 400, description = "Invalid or duplicate fields", body = ValidationErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = state.identity.register(request).await?;
    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = TokenPair),
        (status = 400, description = "Missing fields", body = ValidationErrorResponse),
        (status = 401, description = "No active account with these credentials", body = AuthFailure),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    Ok(Json(state.identity.login(request).await?))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/token/refresh/",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token issued", body = AccessToken),
        (status = 400, description = "Missing field", body = ValidationErrorResponse),
        (status = 401, description = "Refresh token rejected", body = AuthFailure),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<AccessToken>, ApiError> {
    Ok(Json(state.identity.refresh(request).await?))
}
