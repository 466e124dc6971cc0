use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use campuschat::{app, identity::USER_ID_HEADER, model::Role, store::SqliteStore, AppState};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::ServiceExt;

async fn campus() -> (Router, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let now = OffsetDateTime::now_utc();
    store.upsert_account("a", "Avery Stone", "avery@uni.edu", Role::Student, now).await.unwrap();
    store.upsert_account("b", "Blake Moss", "blake@uni.edu", Role::Faculty, now).await.unwrap();
    store.upsert_account("c", "Casey Fach", "casey@uni.edu", Role::Alumni, now).await.unwrap();
    store.set_presence("b", "online", now).await.unwrap();

    let app_state = AppState::new(store.clone());
    app_state.directory.refresh().await.unwrap();
    (app(app_state), store)
}

fn get(uri: &str, user: &str) -> Request<Body> {
    Request::get(uri)
        .header(USER_ID_HEADER, user)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, user: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(USER_ID_HEADER, user)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn ids(body: &Value) -> Vec<&str> {
    body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let (app, _) = campus().await;
    let response = app
        .oneshot(Request::get("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roster_hides_self_and_filters() {
    let (app, _) = campus().await;

    let response = app.clone().oneshot(get("/users", "a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(ids(&body), ["b", "c"]);
    assert_eq!(body["users"][0]["status"], "online");
    assert_eq!(body["users"][1]["status"], "offline");

    // "fac" hits Blake's role and Casey's surname
    let body = json_body(app.oneshot(get("/users?q=FAC", "a")).await.unwrap()).await;
    assert_eq!(ids(&body), ["b", "c"]);
}

#[tokio::test]
async fn me_and_profile_cards() {
    let (app, _) = campus().await;

    let body = json_body(app.clone().oneshot(get("/users/me", "a")).await.unwrap()).await;
    assert_eq!(body["name"], "Avery Stone");
    assert_eq!(body["role"], "Student");

    let body = json_body(app.clone().oneshot(get("/p/b", "a")).await.unwrap()).await;
    assert_eq!(body["initials"], "BM");
    assert_eq!(body["last_seen"], "Active now");

    let response = app.oneshot(get("/p/nobody", "a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_then_read_back() {
    let (app, _) = campus().await;

    let response = app
        .clone()
        .oneshot(post_json("/c/b", "a", json!({"content": "  hello  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = json_body(app.clone().oneshot(get("/c/a", "b")).await.unwrap()).await;
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "hello");
    assert_eq!(messages[0]["sender_id"], "a");
    assert_eq!(messages[0]["is_own"], false);

    let body = json_body(app.oneshot(get("/c/b", "a")).await.unwrap()).await;
    assert_eq!(body[0]["is_own"], true);
}

#[tokio::test]
async fn blank_messages_and_strangers_are_refused() {
    let (app, store) = campus().await;

    let response = app
        .clone()
        .oneshot(post_json("/c/b", "a", json!({"content": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/c/zed", "a", json!({"content": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn refresh_picks_up_new_accounts() {
    let (app, store) = campus().await;
    store
        .upsert_account("d", "Devon Park", "devon@uni.edu", Role::Faculty, OffsetDateTime::now_utc())
        .await
        .unwrap();

    let body = json_body(app.clone().oneshot(get("/users", "a")).await.unwrap()).await;
    assert_eq!(ids(&body), ["b", "c"]);

    let response = app
        .clone()
        .oneshot(Request::post("/users/refresh").header(USER_ID_HEADER, "a").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(app.oneshot(get("/users", "a")).await.unwrap()).await;
    assert_eq!(ids(&body), ["b", "c", "d"]);
}
