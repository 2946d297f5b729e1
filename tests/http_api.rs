//! HTTP API Tests
//!
//! Drives the axum router directly with `oneshot` and checks every route's
//! status codes and bodies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use relstore::rest_api::RestServer;
use relstore::schema::{AssociationDef, CollectionSchema, FieldDef, SchemaRegistry};
use relstore::store::RecordStore;
use serde_json::{json, Value};
use tower::ServiceExt;

// =============================================================================
// Helper Functions
// =============================================================================

fn app() -> Router {
    let users = CollectionSchema::new("users", HashMap::new())
        .with_field("name", FieldDef::required_string())
        .with_field("age", FieldDef::optional_integer());
    let posts = CollectionSchema::new("posts", HashMap::new())
        .with_field("title", FieldDef::required_string())
        .with_field("userId", FieldDef::optional_integer());
    let registry = SchemaRegistry::build(
        vec![users, posts],
        vec![AssociationDef::new("users", "posts", "userId")],
    )
    .unwrap();

    RestServer::new(Arc::new(RecordStore::new(registry))).router()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(text) => {
            builder = builder.header("content-type", "application/json");
            Body::from(text.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, collection: &str, body: Value) -> Value {
    let (status, value) = send(
        app,
        Method::POST,
        &format!("/{}", collection),
        Some(&body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", value);
    value["data"].clone()
}

// =============================================================================
// Route Tests
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_returns_201_with_system_fields() {
    let app = app();
    let user = create(&app, "users", json!({"name": "John"})).await;

    assert_eq!(user["id"], 1);
    assert_eq!(user["name"], "John");
    assert!(user["createdAt"].is_string());
    assert!(user["updatedAt"].is_string());
}

#[tokio::test]
async fn test_create_invalid_payload_is_400() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/users", Some(r#"{"age": 3}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, _) = send(&app, Method::POST, "/users", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/users", Some(r#"["John"]"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_collection_is_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/ghosts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_read_by_id() {
    let app = app();
    create(&app, "users", json!({"name": "John"})).await;

    let (status, body) = send(&app, Method::GET, "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "John");

    let (status, _) = send(&app, Method::GET, "/users/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/users/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_with_query() {
    let app = app();
    for (name, age) in [("Ann", 31), ("Bob", 25), ("Cid", 40)] {
        create(&app, "users", json!({"name": name, "age": age})).await;
    }

    let (status, body) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["offset"], 0);

    let (status, body) = send(&app, Method::GET, "/users?age=gt.30&order=age.desc", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cid", "Ann"]);

    let (status, body) = send(&app, Method::GET, "/users?limit=1&offset=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"][0]["name"], "Bob");

    let (status, _) = send(&app, Method::GET, "/users?nickname=eq.x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/users?limit=5000", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filter_on_timestamp() {
    let app = app();
    let user = create(&app, "users", json!({"name": "John"})).await;
    let created_at = user["createdAt"].as_str().unwrap().to_string();
    assert!(created_at.ends_with('Z'));

    let uri = format!("/users?createdAt=eq.{}", created_at);
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], user["id"]);

    // Same instant written with an explicit offset
    let offset_form = created_at.replace('Z', "%2B00:00");
    let uri = format!("/users?createdAt=eq.{}", offset_form);
    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["count"], 1);

    let uri = format!("/users?createdAt=gt.{}", created_at);
    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["count"], 0);

    let (_, body) = send(&app, Method::GET, "/users?createdAt=gt.2000-01-01T00:00:00Z", None).await;
    assert_eq!(body["count"], 1);

    let (status, _) = send(&app, Method::GET, "/users?createdAt=gt.yesterday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_repeated_filter_key_is_a_range() {
    let app = app();
    for (name, age) in [("Ann", 15), ("Bob", 20), ("Cid", 29), ("Dee", 30)] {
        create(&app, "users", json!({"name": name, "age": age})).await;
    }

    let (status, body) = send(&app, Method::GET, "/users?age=gt.18&age=lt.30", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob", "Cid"]);
}

#[tokio::test]
async fn test_order_by_unknown_field_is_400() {
    let app = app();
    create(&app, "users", json!({"name": "John"})).await;

    let (status, body) = send(&app, Method::GET, "/users?order=nickname.asc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    for order in ["id.desc", "createdAt.asc", "updatedAt.desc", "name.asc"] {
        let (status, _) = send(&app, Method::GET, &format!("/users?order={}", order), None).await;
        assert_eq!(status, StatusCode::OK, "order={}", order);
    }

    let (status, _) = send(&app, Method::GET, "/users/1/posts?order=name.asc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update() {
    let app = app();
    let user = create(&app, "users", json!({"name": "John", "age": 30})).await;

    let (status, body) = send(&app, Method::PUT, "/users/1", Some(r#"{"age": 31}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["age"], 31);
    assert_eq!(body["data"]["name"], "John");
    assert_ne!(body["data"]["updatedAt"], user["updatedAt"]);

    let (status, _) = send(&app, Method::PUT, "/users/9", Some(r#"{"age": 1}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::PUT, "/users/1", Some(r#"{"age": "old"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_destroy() {
    let app = app();
    create(&app, "users", json!({"name": "John"})).await;

    let (status, body) = send(&app, Method::DELETE, "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "users with id 1 deleted");
    assert_eq!(body["deleted"], 1);

    let (status, _) = send(&app, Method::GET, "/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_children_route() {
    let app = app();
    create(&app, "users", json!({"name": "John"})).await;
    create(&app, "posts", json!({"title": "Hi", "userId": 1})).await;
    create(&app, "posts", json!({"title": "Again", "userId": 1})).await;

    let (status, body) = send(&app, Method::GET, "/users/1/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["title"], "Hi");
    assert_eq!(body["data"][0]["userId"], 1);

    let (status, body) = send(&app, Method::GET, "/users/1/posts?title=Again", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = send(&app, Method::GET, "/users/2/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/users/1/comments", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dangling_foreign_key_is_409() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        Some(r#"{"title": "Hi", "userId": 7}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_request_id_header() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
