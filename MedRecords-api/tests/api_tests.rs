use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use med_records_api::{create_app, AppState};
use med_records_data::repository::{UserRepository, UserRepositoryTrait};
use med_records_domain::auth::AuthenticatedUser;
use med_records_domain::services::ResourceScope;
use med_records_domain::testing::{TestContext, TEST_PASSWORD};

struct TestApp {
    ctx: TestContext,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_scope(ResourceScope::Caller)
    }

    fn with_scope(scope: ResourceScope) -> Self {
        let ctx = TestContext::new();
        let state = AppState::new(ctx.pool.clone(), ctx.tokens.clone(), scope, "test");
        Self {
            router: create_app(state),
            ctx,
        }
    }

    async fn send(&self, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            request = request.header(header::AUTHORIZATION, bearer);
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, bearer, None).await
    }

    async fn post(&self, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, bearer, Some(body)).await
    }

    async fn doctor(&self, username: &str) -> (AuthenticatedUser, String) {
        let user = self.ctx.create_user(username, true).await;
        let bearer = self.ctx.bearer(&user);
        (user, bearer)
    }
}

fn registration(username: &str, password2: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": TEST_PASSWORD,
        "password2": password2,
        "is_doctor": true,
    })
}

fn patient(name: &str, age: i64) -> Value {
    json!({ "name": name, "age": age, "gender": "Female" })
}

#[tokio::test]
async fn test_register_with_mismatched_passwords() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/register/", None, registration("house", "something-else-2004"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": { "password": ["Password fields didn't match."] } }));
}

#[tokio::test]
async fn test_register_mismatch_with_taken_username() {
    let app = TestApp::new();
    app.doctor("house").await;

    let mut body = registration("house", "something-else-2004");
    body["email"] = json!("cuddy@example.com");
    let (status, body) = app.post("/register/", None, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": {
            "username": ["A user with that username already exists."],
            "password": ["Password fields didn't match."],
        } })
    );
}

#[tokio::test]
async fn test_register_rejects_oversized_credentials() {
    let app = TestApp::new();
    let long = "h".repeat(20_000);

    let started = std::time::Instant::now();
    let (status, body) = app
        .post(
            "/register/",
            None,
            json!({
                "username": long,
                "email": "house@example.com",
                "password": long.to_uppercase(),
                "password2": long.to_uppercase(),
            }),
        )
        .await;
    assert!(started.elapsed() < std::time::Duration::from_secs(2));

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": {
            "username": ["Ensure this field has no more than 150 characters."],
            "password": ["Ensure this field has no more than 128 characters."],
            "password2": ["Ensure this field has no more than 128 characters."],
        } })
    );
}

#[tokio::test]
async fn test_register_then_login() {
    let app = TestApp::new();

    let (status, user) = app
        .post("/register/", None, registration("house", TEST_PASSWORD))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "house");
    assert_eq!(user["is_doctor"], true);
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let (status, tokens) = app
        .post("/login/", None, json!({ "username": "house", "password": TEST_PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!tokens["access"].as_str().unwrap().is_empty());
    assert!(!tokens["refresh"].as_str().unwrap().is_empty());

    let bearer = format!("Bearer {}", tokens["access"].as_str().unwrap());
    let (status, patients) = app.get("/patients/", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patients, json!([]));
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new();
    app.ctx.create_user("house", true).await;

    let (status, body) = app
        .post("/login/", None, json!({ "username": "house", "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "No active account found with the given credentials");

    let (status, body) = app.post("/login/", None, json!({ "username": "house" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": { "password": ["This field is required."] } }));
}

#[tokio::test]
async fn test_single_patient_is_owned_by_caller() {
    let app = TestApp::new();
    app.ctx.create_user("first", true).await;
    app.ctx.create_user("second", true).await;
    let (doctor, bearer) = app.doctor("third").await;
    assert_eq!(doctor.user_id, 3);

    let (status, body) = app
        .post(
            "/patients/",
            Some(&bearer),
            json!({ "name": "John Doe", "age": 45, "gender": "Male", "doctor": 1 }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({ "id": 1, "name": "John Doe", "age": 45, "gender": "Male", "doctor": 3 })
    );
}

#[tokio::test]
async fn test_patient_batch_create() {
    let app = TestApp::new();
    let (doctor, bearer) = app.doctor("house").await;

    let (status, body) = app
        .post(
            "/patients/",
            Some(&bearer),
            json!([patient("Ann", 30), patient("Ben", 40), patient("Cat", 50)]),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let created = body.as_array().unwrap();
    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|p| p["doctor"] == json!(doctor.user_id)));
    assert_eq!(created[1]["name"], "Ben");
}

#[tokio::test]
async fn test_patient_batch_with_invalid_item_persists_nothing() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let (status, body) = app
        .post(
            "/patients/",
            Some(&bearer),
            json!([patient("Ann", 30), patient("Ben", -1), patient("Cat", 50)]),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["error"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0], json!({}));
    assert!(errors[1].get("age").is_some());
    assert_eq!(errors[2], json!({}));

    let (_, listed) = app.get("/patients/", Some(&bearer)).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_empty_patient_batch() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let (status, body) = app.post("/patients/", Some(&bearer), json!([])).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_patient_field_errors() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let (status, body) = app
        .post("/patients/", Some(&bearer), json!({ "name": "  ", "gender": "Male" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["name"], json!(["This field may not be blank."]));
    assert_eq!(body["error"]["age"], json!(["This field is required."]));
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/patients/")
        .header(header::AUTHORIZATION, &bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["non_field_errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_doctor_cannot_create_patients() {
    let app = TestApp::new();
    let nurse = app.ctx.create_user("nurse", false).await;
    let bearer = app.ctx.bearer(&nurse);

    let (status, body) = app.post("/patients/", Some(&bearer), patient("Ann", 30)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "You do not have permission to perform this action.");
}

#[tokio::test]
async fn test_heart_rate_create_and_list() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;
    let (_, created) = app.post("/patients/", Some(&bearer), patient("Ann", 30)).await;
    let patient_id = created["id"].as_i64().unwrap();

    let (status, reading) = app
        .post(
            "/heart_rates/",
            Some(&bearer),
            json!({ "patient": patient_id, "rate": 72, "recorded_at": "1999-01-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reading["rate"], 72);
    assert_eq!(reading["patient"], patient_id);
    assert_ne!(reading["recorded_at"], "1999-01-01T00:00:00Z");

    let (status, listed) = app.get("/heart_rates/", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([reading.clone()]));
    assert!(listed[0]["recorded_at"].is_string());

    let uri = format!("/heart_rates/{}/", reading["id"]);
    let (status, fetched) = app.get(&uri, Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, reading);
}

#[tokio::test]
async fn test_heart_rate_for_unknown_patient() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let (status, body) = app
        .post("/heart_rates/", Some(&bearer), json!([{ "patient": 42, "rate": 60 }]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": [{ "patient": ["Invalid pk \"42\" - object does not exist."] }] })
    );
}

#[tokio::test]
async fn test_heart_rate_batch_with_many_distinct_patients() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let readings: Vec<Value> = (1..=40_000)
        .map(|patient| json!({ "patient": patient, "rate": 60 }))
        .collect();
    let (status, body) = app.post("/heart_rates/", Some(&bearer), Value::Array(readings)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["error"].as_array().unwrap();
    assert_eq!(errors.len(), 40_000);
    assert_eq!(
        errors[39_999],
        json!({ "patient": ["Invalid pk \"40000\" - object does not exist."] })
    );
}

#[tokio::test]
async fn test_protected_endpoints_require_authorization() {
    let app = TestApp::new();

    for uri in ["/patients/", "/patients/1/", "/heart_rates/", "/heart_rates/1/"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "GET {}", uri);
        assert_eq!(body["code"], "not_authenticated");
    }
    for uri in ["/patients/", "/heart_rates/"] {
        let (status, _) = app.post(uri, None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "POST {}", uri);
    }
}

#[tokio::test]
async fn test_refresh_flow() {
    let app = TestApp::new();
    let doctor = app.ctx.create_user("house", true).await;
    let pair = app.ctx.tokens.issue_pair(doctor.user_id, true).unwrap();

    let (status, body) = app
        .post("/token/refresh/", None, json!({ "refresh": pair.refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = format!("Bearer {}", body["access"].as_str().unwrap());
    let (status, _) = app.get("/patients/", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/token/refresh/", None, json!({ "refresh": pair.access }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");

    let refresh_as_bearer = format!("Bearer {}", pair.refresh);
    let (status, _) = app.get("/patients/", Some(&refresh_as_bearer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/token/refresh/", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_doctors_are_isolated() {
    let app = TestApp::new();
    let (_, alice) = app.doctor("alice").await;
    let (_, bob) = app.doctor("bob").await;

    let (_, created) = app.post("/patients/", Some(&alice), patient("Ann", 30)).await;
    let uri = format!("/patients/{}/", created["id"]);

    let (status, listed) = app.get("/patients/", Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));

    let (status, body) = app.get(&uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));

    let (status, _) = app.get(&uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_global_scope_shares_records() {
    let app = TestApp::with_scope(ResourceScope::Global);
    let (_, alice) = app.doctor("alice").await;
    let (_, bob) = app.doctor("bob").await;

    app.post("/patients/", Some(&alice), patient("Ann", 30)).await;

    let (_, listed) = app.get("/patients/", Some(&bob)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_and_non_numeric_ids_are_not_found() {
    let app = TestApp::new();
    let (_, bearer) = app.doctor("house").await;

    let (status, _) = app.get("/patients/99/", Some(&bearer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/heart_rates/abc/", Some(&bearer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));
}

#[tokio::test]
async fn test_deleting_a_doctor_cascades() {
    let app = TestApp::with_scope(ResourceScope::Global);
    let (doctor, bearer) = app.doctor("house").await;
    let (_, observer) = app.doctor("wilson").await;

    let (_, created) = app.post("/patients/", Some(&bearer), patient("Ann", 30)).await;
    app.post(
        "/heart_rates/",
        Some(&bearer),
        json!({ "patient": created["id"], "rate": 80 }),
    )
    .await;

    let users = UserRepository::new(app.ctx.pool.clone());
    assert!(users.delete(doctor.user_id).await.unwrap());

    let (_, patients) = app.get("/patients/", Some(&observer)).await;
    assert_eq!(patients, json!([]));
    let (_, readings) = app.get("/heart_rates/", Some(&observer)).await;
    assert_eq!(readings, json!([]));
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = TestApp::new();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["database"]["status"], "ok");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new();

    let (status, body) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/patients/").is_some());
}
