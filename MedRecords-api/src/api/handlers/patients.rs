use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use med_records_domain::auth::{AuthFailure, AuthenticatedUser};
use med_records_domain::entities::{CreatePatientRequest, Patient};
use med_records_domain::services::Payload;

use crate::api::error::{ApiError, ApiJson};
use crate::api::handlers::parse_id;
use crate::api::routes::AppState;
use crate::entities::common::{DetailResponse, UnexpectedErrorResponse, ValidationErrorResponse};

/// List the caller's patients
#[utoipa::path(
    get,
    path = "/patients/",
    responses(
        (status = 200, description = "Patients visible to the caller", body = [Patient]),
        (status = 401, description = "Not authenticated", body = AuthFailure),
    ),
    security(("bearer" = [])),
    tag = "patients"
)]
#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.list_patients(&caller).await?))
}

/// Create one patient, or many from an array; the caller becomes the owner
#[utoipa::path(
    post,
    path = "/patients/",
    request_body(content = CreatePatientRequest, description = "One patient object or an array of them"),
    responses(
        (status = 201, description = "Created; an array request returns an array", body = Patient),
        (status = 400, description = "Invalid fields; nothing was created", body = ValidationErrorResponse),
        (status = 401, description = "Not authenticated", body = AuthFailure),
        (status = 403, description = "Caller is not a doctor", body = DetailResponse),
        (status = 500, description = "Unexpected failure", body = UnexpectedErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "patients"
)]
#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn create_patients(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ApiJson(payload): ApiJson<Payload<CreatePatientRequest>>,
) -> Result<(StatusCode, Json<Payload<Patient>>), ApiError> {
    let batch = payload.is_batch();
    let created = state.patients.create_patients(&caller, payload).await?;
    info!("Created {} patient(s) (batch: {})", created.len(), batch);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Retrieve one of the caller's patients
#[utoipa::path(
    get,
    path = "/patients/{id}/",
    params(("id" = i64, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient found", body = Patient),
        (status = 401, description = "Not authenticated", body = AuthFailure),
        (status = 404, description = "No such patient for this caller", body = DetailResponse),
    ),
    security(("bearer" = [])),
    tag = "patients"
)]
#[instrument(skip_all, fields(user_id = caller.user_id, id = %id))]
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.patients.get_patient(&caller, id).await?))
}
