//! # API REST
//!
//! REST API for the clinic backend.
//!
//! Handles:
//! - HTTP endpoints with axum, one route module per clinic area
//! - API-key authentication, tenant and branch scoping
//! - Correlation ids, request timeouts and rate limiting
//! - The JSON error envelope and OpenAPI/Swagger documentation
//!
//! Business rules live in `clinic-core`; this crate only translates HTTP to service calls.

#![warn(rust_2018_idioms)]

pub mod docs;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use crate::middleware::{auth, correlation, rate_limit, timeout};
use api_shared::ApiKeyRegistry;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use clinic_core::{ClinicConfig, ClinicServices};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the application with every route and middleware layer.
///
/// Layers run outermost first: trace, correlation id, timeout, authentication, rate limit.
pub fn build_router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %req.method(),
            uri = %req.uri(),
            correlation_id = tracing::field::Empty,
        )
    });

    routes::router(state.config.max_upload_bytes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(trace)
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    correlation::propagate,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    timeout::enforce,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    auth::resolve_principal,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    rate_limit::limit,
                )),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Opens storage, then serves the API on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if storage cannot be opened, the address cannot be bound, or the server
/// fails while running.
pub async fn serve(config: ClinicConfig, keys: ApiKeyRegistry, addr: &str) -> anyhow::Result<()> {
    if keys.is_empty() {
        tracing::warn!("no API keys configured; every /api route will answer 401");
    }
    let services = ClinicServices::from_config(&config)?;
    let app = build_router(AppState::new(services, config, keys));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ Starting clinic REST API on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("-- Clinic REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::{API_KEY_HEADER, BRANCH_ID_HEADER, CORRELATION_ID_HEADER, RETRY_AFTER_HEADER};
    use axum::http::{Method, StatusCode};
    use axum::response::Response;
    use clinic_core::{Environment, RateLimitConfig, RecordId, Stores};
    use clinic_files::AttachmentStore;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const KEYS: &str = "admin-key:acme:u-1:admin,staff-key:acme:u-2:staff,globex-key:globex:u-9:staff";

    fn test_state(config: ClinicConfig) -> (AppState, TempDir) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let attachments = AttachmentStore::new(&temp.path().join("attachments"))
            .expect("Failed to open attachment store");
        let services = ClinicServices::new(Stores::in_memory(), attachments, 1024 * 1024);
        let keys = ApiKeyRegistry::parse(KEYS).expect("Failed to parse keys");
        (AppState::new(services, config, keys), temp)
    }

    fn dev_config() -> ClinicConfig {
        ClinicConfig::default().with_environment(Environment::Development)
    }

    async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        build_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn new_patient(first: &str) -> Value {
        json!({
            "firstName": first,
            "lastName": "Lovelace",
            "dateOfBirth": "1985-12-10",
            "sex": "Female",
            "email": "ADA@example.org"
        })
    }

    #[tokio::test]
    async fn health_is_open_and_gets_a_correlation_id() {
        let (state, _temp) = test_state(dev_config());
        let response = send(&state, Method::GET, "/health", None, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[CORRELATION_ID_HEADER].to_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(json_body(response).await["ok"], true);
    }

    #[tokio::test]
    async fn incoming_correlation_id_reaches_the_error_body() {
        let (state, _temp) = test_state(dev_config());
        let request = Request::builder()
            .uri("/api/patients")
            .header(CORRELATION_ID_HEADER, "client-req-7")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[CORRELATION_ID_HEADER], "client-req-7");
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["traceId"], "client-req-7");
    }

    #[tokio::test]
    async fn unknown_key_is_rejected_and_known_key_is_echoed() {
        let (state, _temp) = test_state(dev_config());
        let response = send(&state, Method::POST, "/api/auth/verify", Some("nope"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response =
            send(&state, Method::POST, "/api/auth/verify", Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["userId"], "u-2");
        assert_eq!(body["tenantId"], "acme");
        assert_eq!(body["role"], "Staff");
    }

    #[tokio::test]
    async fn patient_lifecycle_over_http() {
        let (state, _temp) = test_state(dev_config());

        let response = send(
            &state,
            Method::POST,
            "/api/patients",
            Some("staff-key"),
            Some(new_patient("Ada")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["email"], "ada@example.org");
        let id = created["id"].as_str().unwrap().to_string();
        let path = format!("/api/patients/{id}");

        let response = send(&state, Method::GET, &path, Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&state, Method::GET, &path, Some("globex-key"), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(
            &state,
            Method::GET,
            "/api/patients?q=lovelace&page=1&pageSize=5",
            Some("staff-key"),
            None,
        )
        .await;
        let page = json_body(response).await;
        assert_eq!(page["totalCount"], 1);
        assert_eq!(page["pageSize"], 5);

        let response = send(&state, Method::DELETE, &path, Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&state, Method::GET, &path, Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn validation_failures_list_every_field() {
        let (state, _temp) = test_state(dev_config());
        let mut patient = new_patient("");
        patient["email"] = json!("not-an-email");

        let response = send(&state, Method::POST, "/api/patients", Some("staff-key"), Some(patient)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert!(body["errors"]["firstName"].is_array());
        assert!(body["errors"]["email"].is_array());
    }

    #[tokio::test]
    async fn malformed_json_uses_the_envelope() {
        let (state, _temp) = test_state(dev_config());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/patients")
            .header(API_KEY_HEADER, "staff-key")
            .header("content-type", "application/json")
            .body(Body::from("{\"firstName\": "))
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["errors"]["body"].is_array());
    }

    #[tokio::test]
    async fn bad_branch_header_is_a_validation_error() {
        let (state, _temp) = test_state(dev_config());
        let request = Request::builder()
            .uri("/api/inventory")
            .header(API_KEY_HEADER, "staff-key")
            .header(BRANCH_ID_HEADER, "main-street")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn diagnostics_require_admin() {
        let (state, _temp) = test_state(dev_config());
        send(&state, Method::POST, "/api/patients", Some("staff-key"), Some(new_patient("Ada"))).await;

        let response = send(&state, Method::GET, "/api/diagnostics", Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&state, Method::GET, "/api/diagnostics", Some("admin-key"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["environment"], "Development");
        assert_eq!(body["storage"], "memory");
        let patients = body["counts"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["entity"] == "patient")
            .unwrap();
        assert_eq!(patients["total"], 1);
    }

    #[tokio::test]
    async fn rate_limit_returns_retry_after() {
        let config = dev_config().with_rate_limits(RateLimitConfig {
            window: Duration::from_secs(60),
            global: 2,
            auth: 10,
            sensitive: 10,
        });
        let (state, _temp) = test_state(config);

        for _ in 0..2 {
            let response = send(&state, Method::GET, "/api/waitlist", Some("staff-key"), None).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = send(&state, Method::GET, "/api/waitlist", Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: u64 = response.headers()[RETRY_AFTER_HEADER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry));

        // A different caller has its own window.
        let response = send(&state, Method::GET, "/api/waitlist", Some("globex-key"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn failed_keys_count_against_the_auth_limit() {
        let config = dev_config().with_rate_limits(RateLimitConfig {
            window: Duration::from_secs(60),
            global: 100,
            auth: 2,
            sensitive: 10,
        });
        let (state, _temp) = test_state(config);

        for guess in ["guess-1", "guess-2"] {
            let response = send(&state, Method::GET, "/api/patients", Some(guess), None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        let response = send(&state, Method::GET, "/api/patients", Some("guess-3"), None).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(RETRY_AFTER_HEADER));
        assert_eq!(json_body(response).await["success"], false);

        // Valid keys are counted per user, not per client.
        let response = send(&state, Method::GET, "/api/patients", Some("staff-key"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    fn photo_upload(uri: &str, content_type: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(API_KEY_HEADER, "staff-key")
            .header(CORRELATION_ID_HEADER, "upload-1")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_upload_uses_the_envelope() {
        let (state, _temp) = test_state(dev_config());
        let uri = format!("/api/visits/{}/photos", RecordId::new());
        let request = photo_upload(&uri, "application/json", b"{}".to_vec());
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["traceId"], "upload-1");
        assert!(body["errors"]["photo"].is_array());
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let (state, _temp) = test_state(dev_config().with_max_upload_bytes(1024));
        let uri = format!("/api/visits/{}/photos", RecordId::new());

        let mut body = b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"big.png\"\r\nContent-Type: image/png\r\n\r\n".to_vec();
        body.extend(std::iter::repeat(0u8).take(128 * 1024));
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
        let request = photo_upload(&uri, "multipart/form-data; boundary=XBOUNDARY", body);
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["traceId"], "upload-1");
    }

    #[tokio::test]
    async fn inventory_expiry_window_is_bounded() {
        let (state, _temp) = test_state(dev_config());
        let response = send(
            &state,
            Method::GET,
            "/api/inventory/expiring?days=5000",
            Some("staff-key"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &state,
            Method::GET,
            "/api/inventory/expiring",
            Some("staff-key"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _temp) = test_state(dev_config());
        let response = send(&state, Method::GET, "/api-docs/openapi.json", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"]["/api/patients"].is_object());
        let upload = &doc["paths"]["/api/visits/{id}/photos"]["post"];
        assert!(upload["requestBody"]["content"]["multipart/form-data"].is_object());
        assert!(upload["responses"]["413"].is_object());

        let schemas = &doc["components"]["schemas"];
        assert_eq!(schemas["EmailAddress"]["type"], "string");
        assert_eq!(schemas["RecordId"]["type"], "string");
        assert_eq!(schemas["RecordId"]["example"], "550e8400e29b41d4a716446655440000");
        assert_eq!(schemas["PhotoUpload"]["properties"]["photo"]["format"], "binary");
    }
}
