//! Repository tests against a real PostgreSQL instance.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

use serde_json::json;
use sqlx::PgPool;

use sensorboard_db::models::dashboard::{CreateDashboard, UpdateDashboard};
use sensorboard_db::models::user::CreateUser;
use sensorboard_db::repositories::{DashboardRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, email: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            display_name: "Test User".to_string(),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

fn new_dashboard(name: &str) -> CreateDashboard {
    CreateDashboard {
        name: name.to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn bootstrap_health_check(pool: PgPool) {
    sensorboard_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_defaults_to_empty_widget_list(pool: PgPool) {
    let user = new_user(&pool, "a@example.com").await;
    let dash = DashboardRepo::create(&pool, user, &new_dashboard("Home"))
        .await
        .unwrap();

    assert_eq!(dash.name, "Home");
    assert_eq!(dash.widgets, json!([]));
    assert!(!dash.is_public);
    assert!(dash.placements().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn queries_are_scoped_to_owner(pool: PgPool) {
    let alice = new_user(&pool, "alice@example.com").await;
    let bob = new_user(&pool, "bob@example.com").await;
    let dash = DashboardRepo::create(&pool, alice, &new_dashboard("Lab"))
        .await
        .unwrap();

    assert!(DashboardRepo::find_for_user(&pool, dash.id, bob).await.unwrap().is_none());
    assert!(DashboardRepo::list_by_user(&pool, bob).await.unwrap().is_empty());
    assert!(!DashboardRepo::delete(&pool, dash.id, bob).await.unwrap());

    let rename = UpdateDashboard {
        name: Some("Stolen".to_string()),
        ..Default::default()
    };
    assert!(DashboardRepo::update(&pool, dash.id, bob, &rename).await.unwrap().is_none());

    assert!(DashboardRepo::delete(&pool, dash.id, alice).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_is_partial(pool: PgPool) {
    let user = new_user(&pool, "c@example.com").await;
    let mut input = new_dashboard("Greenhouse");
    input.description = Some("Sensors in the back".to_string());
    let dash = DashboardRepo::create(&pool, user, &input).await.unwrap();

    let patch = UpdateDashboard {
        is_public: Some(true),
        ..Default::default()
    };
    let updated = DashboardRepo::update(&pool, dash.id, user, &patch)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "Greenhouse");
    assert_eq!(updated.description.as_deref(), Some("Sensors in the back"));
    assert!(updated.is_public);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_widgets_replaces_list_and_bumps_ordering(pool: PgPool) {
    let user = new_user(&pool, "d@example.com").await;
    let first = DashboardRepo::create(&pool, user, &new_dashboard("First")).await.unwrap();
    let second = DashboardRepo::create(&pool, user, &new_dashboard("Second")).await.unwrap();

    let widgets = json!([
        { "id": "clock-1", "type": "clock", "x": 0, "y": 0, "w": 2, "h": 2, "props": {} }
    ]);
    assert!(DashboardRepo::update_widgets(&pool, first.id, &widgets).await.unwrap());

    let list = DashboardRepo::list_by_user(&pool, user).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, first.id, "most recently updated comes first");
    assert_eq!(list[1].id, second.id);

    let placements = list[0].placements().unwrap();
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].id, "clock-1");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn email_lookup_ignores_case(pool: PgPool) {
    let id = new_user(&pool, "Case@Example.com").await;
    let found = UserRepo::find_by_email(&pool, "case@example.COM")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, id);
}
