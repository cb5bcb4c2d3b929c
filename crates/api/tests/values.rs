mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{bearer, body_json, build_test_app, build_test_app_with_store, get, send, unreachable_pool};
use sensorboard_realtime::MemoryValueStore;
use serde_json::json;

#[tokio::test]
async fn written_values_read_back() {
    let app = build_test_app(unreachable_pool());
    let auth = bearer(1);

    let response = send(
        &app,
        Method::PUT,
        "/api/v1/values/sensors/kitchen/temperature",
        Some(&auth),
        Some(json!(21.5)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["path"], "/sensors/kitchen/temperature");

    let json = body_json(get(&app, "/api/v1/values/sensors/kitchen", Some(&auth)).await).await;
    assert_eq!(json["data"]["value"], json!({ "temperature": 21.5 }));
}

#[tokio::test]
async fn missing_value_reads_as_null() {
    let app = build_test_app(unreachable_pool());
    let json = body_json(get(&app, "/api/v1/values/nothing/here", Some(&bearer(1))).await).await;
    assert_eq!(json["data"]["value"], serde_json::Value::Null);
}

#[tokio::test]
async fn invalid_path_is_rejected() {
    let app = build_test_app(unreachable_pool());
    let response = get(&app, "/api/v1/values/sensors/a.b", Some(&bearer(1))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_PATH");
}

#[tokio::test]
async fn unconfigured_store_answers_503() {
    let app = build_test_app_with_store(
        unreachable_pool(),
        Arc::new(MemoryValueStore::unconfigured()),
    );

    let response = get(&app, "/api/v1/values/sensors/t", Some(&bearer(1))).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "REALTIME_NOT_CONFIGURED");
    assert_eq!(
        json["error"],
        "Realtime store not initialized. Configure the value store connection first."
    );
}
