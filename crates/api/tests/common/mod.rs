#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sensorboard_api::auth::jwt::{generate_access_token, JwtConfig};
use sensorboard_api::config::ServerConfig;
use sensorboard_api::persistence::PgDashboardStore;
use sensorboard_api::routes;
use sensorboard_api::state::AppState;
use sensorboard_api::ws::WsManager;
use sensorboard_core::placement::GridSpec;
use sensorboard_realtime::{MemoryValueStore, ValueStore};
use sensorboard_sync::SessionRegistry;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        autosave_delay: Duration::from_millis(50),
        session_idle: Duration::from_secs(300),
        grid: GridSpec::default(),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// A pool that never connects, for routes that do not touch the database.
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://sensorboard@127.0.0.1:1/unreachable")
        .expect("lazy pool")
}

pub fn bearer(user_id: i64) -> String {
    let token = generate_access_token(user_id, "tester@example.com", &test_config().jwt)
        .expect("token");
    format!("Bearer {token}")
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_store(pool, Arc::new(MemoryValueStore::new()))
}

pub fn build_test_app_with_store(pool: PgPool, value_store: Arc<dyn ValueStore>) -> Router {
    let config = test_config();

    let sessions = Arc::new(SessionRegistry::new(
        Arc::new(PgDashboardStore::new(pool.clone())),
        config.autosave_delay,
        config.grid,
    ));

    let state = AppState {
        pool,
        config: Arc::new(config),
        value_store,
        sessions,
        ws_manager: Arc::new(WsManager::new()),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, auth: Option<&str>) -> axum::response::Response {
    send(app, Method::GET, uri, auth, None).await
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
