use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use med_records_domain::auth::token::TokenService;
use med_records_domain::auth::{auth_middleware, configure_auth};
use med_records_domain::database::DatabasePool;
use med_records_domain::health::{create_health_service, HealthServiceTrait};
use med_records_domain::services::{
    create_heart_rate_service, create_identity_service, create_patient_service, HeartRateServiceTrait,
    IdentityServiceTrait, PatientServiceTrait, ResourceScope,
};

use crate::api::error;
use crate::api::handlers::{auth, health, heart_rates, patients};
use crate::openapi::configure_swagger_routes;

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityServiceTrait>,
    pub patients: Arc<dyn PatientServiceTrait>,
    pub heart_rates: Arc<dyn HeartRateServiceTrait>,
    pub health: Arc<dyn HealthServiceTrait>,
    pub tokens: TokenService,
    pub environment: Arc<str>,
}

impl AppState {
    /// Wire the SQLite-backed services onto one pool
    pub fn new(pool: DatabasePool, tokens: TokenService, scope: ResourceScope, environment: &str) -> Self {
        debug!("Building application state with {} resource scope", scope);

        Self {
            identity: Arc::new(create_identity_service(pool.clone(), tokens.clone())),
            patients: Arc::new(create_patient_service(pool.clone(), scope)),
            heart_rates: Arc::new(create_heart_rate_service(pool.clone(), scope)),
            health: Arc::new(create_health_service(pool)),
            tokens,
            environment: Arc::from(environment),
        }
    }
}

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    // Protected routes; route_layer keeps unknown paths as 404 rather than 401
    let protected_routes = Router::new()
        .route(
            "/patients/",
            get(patients::list_patients).post(patients::create_patients),
        )
        .route("/patients/:id/", get(patients::get_patient))
        .route(
            "/heart_rates/",
            get(heart_rates::list_heart_rates).post(heart_rates::create_heart_rates),
        )
        .route("/heart_rates/:id/", get(heart_rates::get_heart_rate))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth_middleware,
        ));

    debug!("Protected routes configured");

    let public_routes = Router::new()
        .route("/register/", post(auth::register))
        .route("/login/", post(auth::login))
        .route("/token/refresh/", post(auth::refresh))
        .route("/health", get(health::health_check));

    debug!("Public routes configured");

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(error::not_found)
        .with_state(state)
        .merge(configure_swagger_routes())
        .layer(TraceLayer::new_for_http());

    health::initialize_server_start_time();

    configure_auth(app)
}
