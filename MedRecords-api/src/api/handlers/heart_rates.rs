use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use med_records_domain::auth::{AuthFailure, AuthenticatedUser};
use med_records_domain::entities::{CreateHeartRateRequest, HeartRate};
use med_records_domain::services::Payload;

use crate::api::error::{ApiError, ApiJson};
use crate::api::handlers::parse_id;
use crate::api::routes::AppState;
use crate::entities::common::{DetailResponse, UnexpectedErrorResponse, ValidationErrorResponse};

/// List heart rate readings for the caller's patients
#[utoipa::path(
    get,
    path = "/heart_rates/",
    responses(
        (status = 200, description = "Readings visible to the caller", body = [HeartRate]),
        (status = 401, description = "Not authenticated", body = AuthFailure),
    ),
    security(("bearer" = [])),
    tag = "heart_rates"
)]
#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn list_heart_rates(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<HeartRate>>, ApiError> {
    Ok(Json(state.heart_rates.list_heart_rates(&caller).await?))
}

/// Record one reading, or many from an array; `recorded_at` is set by the server
#[utoipa::path(
    post,
    path = "/heart_rates/",
    request_body(content = CreateHeartRateRequest, description = "One reading object or an array of them"),
    responses(
        (status = 201, description = "Created; an array request returns an array", body = HeartRate),
        (status = 400, description = "Invalid fields or unknown patient; nothing was created", body = ValidationErrorResponse),
        (status = 401, description = "Not authenticated", body = AuthFailure),
        (status = 500, description = "Unexpected failure", body = UnexpectedErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "heart_rates"
)]
#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn create_heart_rates(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ApiJson(payload): ApiJson<Payload<CreateHeartRateRequest>>,
) -> Result<(StatusCode, Json<Payload<HeartRate>>), ApiError> {
    let created = state.heart_rates.create_heart_rates(&caller, payload).await?;
    info!("Recorded {} heart rate reading(s)", created.len());
    Ok((StatusCode::CREATED, Json(created)))
}

/// Retrieve one reading
#[utoipa::path(
    get,
    path = "/heart_rates/{id}/",
    params(("id" = i64, Path, description = "Heart rate reading ID")),
    responses(
        (status = 200, description = "Reading found", body = HeartRate),
        (status = 401, description = "Not authenticated", body = AuthFailure),
        (status = 404, description = "No such reading for this caller", body = DetailResponse),
    ),
    security(("bearer" = [])),
    tag = "heart_rates"
)]
#[instrument(skip_all, fields(user_id = caller.user_id, id = %id))]
pub async fn get_heart_rate(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<HeartRate>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.heart_rates.get_heart_rate(&caller, id).await?))
}
