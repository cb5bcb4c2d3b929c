//! End-to-end dashboard editing against a real PostgreSQL instance.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{body_json, build_test_app, get, send};
use sensorboard_db::repositories::DashboardRepo;
use serde_json::{json, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn register(app: &Router, email: &str) -> (i64, String) {
    let response = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": email,
            "display_name": "Greenhouse Ops",
            "password": "sensor99x",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let user_id = json["data"]["user"]["id"].as_i64().unwrap();
    let token = json["data"]["access_token"].as_str().unwrap();
    (user_id, format!("Bearer {token}"))
}

async fn create_dashboard(app: &Router, auth: &str, name: &str) -> i64 {
    let response = send(
        app,
        Method::POST,
        "/api/v1/dashboards",
        Some(auth),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn add_widget(app: &Router, auth: &str, dashboard_id: i64, tag: &str) -> Value {
    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/dashboards/{dashboard_id}/widgets"),
        Some(auth),
        Some(json!({ "type": tag })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn register_login_and_me(pool: PgPool) {
    let app = build_test_app(pool);
    let (user_id, _) = register(&app, "ops@example.com").await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "OPS@example.com", "password": "sensor99x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let json = body_json(get(&app, "/api/v1/auth/me", Some(&format!("Bearer {token}"))).await).await;
    assert_eq!(json["data"]["id"], user_id);
    assert!(json["data"]["last_login_at"].is_string());
    assert!(json["data"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn bad_credentials_and_duplicates(pool: PgPool) {
    let app = build_test_app(pool);
    register(&app, "ops@example.com").await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ops@example.com", "password": "wrong-pass1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "ops@example.com", "display_name": "Again", "password": "sensor99x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "display_name": "X", "password": "short" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["details"].as_array().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn widgets_are_placed_and_autosaved(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (user_id, auth) = register(&app, "ops@example.com").await;
    let id = create_dashboard(&app, &auth, "Greenhouse").await;

    let first = add_widget(&app, &auth, id, "temperature").await;
    assert!(first["id"].as_str().unwrap().starts_with("temperature-"));
    assert_eq!((first["x"].as_u64(), first["y"].as_u64()), (Some(0), Some(0)));
    assert_eq!((first["w"].as_u64(), first["h"].as_u64()), (Some(3), Some(2)));
    assert_eq!(first["props"]["firebasePath"], "/sensors/temperature");

    let second = add_widget(&app, &auth, id, "temperature").await;
    assert_eq!(second["x"], 3);

    // Debounce is 50ms in tests.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let stored = DashboardRepo::find_for_user(&pool, id, user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.widgets.as_array().unwrap().len(), 2);

    let json = body_json(get(&app, &format!("/api/v1/dashboards/{id}/status"), Some(&auth)).await).await;
    assert!(json["data"]["last_saved"].is_string());
    assert_eq!(json["data"]["saving"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn settings_are_validated(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, auth) = register(&app, "ops@example.com").await;
    let id = create_dashboard(&app, &auth, "Greenhouse").await;
    let widget = add_widget(&app, &auth, id, "temperature").await;
    let widget_id = widget["id"].as_str().unwrap();
    let uri = format!("/api/v1/dashboards/{id}/widgets/{widget_id}/settings");

    let response = send(
        &app,
        Method::PUT,
        &uri,
        Some(&auth),
        Some(json!({ "firebasePath": "  ", "precision": 7 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_FAILED");
    assert_eq!(json["details"].as_array().unwrap().len(), 2);

    let response = send(
        &app,
        Method::PUT,
        &uri,
        Some(&auth),
        Some(json!({ "firebasePath": "/greenhouse/t1", "unit": "fahrenheit" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["props"]["firebasePath"], "/greenhouse/t1");
    assert_eq!(json["data"]["props"]["unit"], "fahrenheit");
    assert_eq!(json["data"]["props"]["precision"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_delete_and_missing_widgets(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, auth) = register(&app, "ops@example.com").await;
    let id = create_dashboard(&app, &auth, "Greenhouse").await;
    let widget = add_widget(&app, &auth, id, "temperature").await;
    let widget_id = widget["id"].as_str().unwrap();

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/dashboards/{id}/widgets/{widget_id}/duplicate"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let copy = body_json(response).await["data"].clone();
    assert_ne!(copy["id"], widget["id"]);
    assert_eq!(copy["x"], 3);

    let response = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/dashboards/{id}/widgets/{widget_id}"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/dashboards/{id}/widgets/{widget_id}"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "WIDGET_NOT_FOUND");

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/dashboards/{id}/widgets"),
        Some(&auth),
        Some(json!({ "type": "radar" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn other_users_dashboards_are_invisible(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, owner) = register(&app, "owner@example.com").await;
    let (_, intruder) = register(&app, "intruder@example.com").await;
    let id = create_dashboard(&app, &owner, "Private").await;

    let response = get(&app, &format!("/api/v1/dashboards/{id}"), Some(&intruder)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/dashboards/{id}/widgets"),
        Some(&intruder),
        Some(json!({ "type": "clock" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(get(&app, "/api/v1/dashboards", Some(&intruder)).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn save_now_and_detail_reflect_the_session(pool: PgPool) {
    let app = build_test_app(pool);
    let (_, auth) = register(&app, "ops@example.com").await;
    let id = create_dashboard(&app, &auth, "Greenhouse").await;

    let json = body_json(get(&app, &format!("/api/v1/dashboards/{id}"), Some(&auth)).await).await;
    assert_eq!(json["data"]["editing"], false);
    assert_eq!(json["data"]["layout"]["cols"], 12);

    add_widget(&app, &auth, id, "switch").await;

    let response = send(&app, Method::POST, &format!("/api/v1/dashboards/{id}/save"), Some(&auth), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["last_saved"].is_string());

    let response = send(
        &app,
        Method::PUT,
        &format!("/api/v1/dashboards/{id}/edit-mode"),
        Some(&auth),
        Some(json!({ "enabled": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(&app, &format!("/api/v1/dashboards/{id}"), Some(&auth)).await).await;
    assert_eq!(json["data"]["editing"], true);
    assert_eq!(json["data"]["edit_mode"], true);
    assert_eq!(json["data"]["widgets"].as_array().unwrap().len(), 1);
}
