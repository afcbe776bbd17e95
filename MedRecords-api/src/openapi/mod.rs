use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the `bearer` scheme referenced by the protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // Account endpoints
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::refresh,

        // Patient endpoints
        crate::api::handlers::patients::list_patients,
        crate::api::handlers::patients::create_patients,
        crate::api::handlers::patients::get_patient,

        // Heart rate endpoints
        crate::api::handlers::heart_rates::list_heart_rates,
        crate::api::handlers::heart_rates::create_heart_rates,
        crate::api::handlers::heart_rates::get_heart_rate,
    ),
    components(
        schemas(
            // Domain entities
            med_records_domain::entities::PublicUser,
            med_records_domain::entities::RegisterRequest,
            med_records_domain::entities::LoginRequest,
            med_records_domain::entities::RefreshRequest,
            med_records_domain::entities::Patient,
            med_records_domain::entities::CreatePatientRequest,
            med_records_domain::entities::HeartRate,
            med_records_domain::entities::CreateHeartRateRequest,

            // Auth schemas
            med_records_domain::auth::token::TokenPair,
            med_records_domain::auth::token::AccessToken,
            med_records_domain::auth::AuthFailure,

            // Error envelopes
            crate::entities::common::ValidationErrorResponse,
            crate::entities::common::DetailResponse,
            crate::entities::common::UnexpectedErrorResponse,

            // Health
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentStatus,
            crate::api::handlers::health::ComponentHealthStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "patients", description = "Patients owned by the calling doctor"),
        (name = "heart_rates", description = "Heart rate readings for the caller's patients")
    ),
    info(
        title = "MedRecords API",
        version = "0.1.0",
        description = "Multi-tenant medical records: doctors, their patients and heart rate readings",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;
