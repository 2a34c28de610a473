use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use northstar_core::ExecutionLimits;
use northstar_server::{app, AppState, Stores};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    app(AppState::new(Stores::memory(), ExecutionLimits::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("x-account-id", "acct").header("x-user-id", user);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn notebook_body(name: &str) -> Value {
    json!({
        "name": name,
        "cells": [{
            "name": "cell",
            "input": { "type": "Code", "language": "python", "body": "print(1)" }
        }]
    })
}

fn transformation_body(name: &str) -> Value {
    json!({
        "name": name,
        "language": "python",
        "entryPoint": "main",
        "code": { "type": "Source", "value": "def main(): pass" }
    })
}

#[tokio::test]
async fn test_health() {
    let app = router();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["schedulers"], json!(["Device", "Timer"]));
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = router();
    let (status, body) = send(&app, "GET", "/api/notebooks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_notebook_sharing() {
    let app = router();

    let (status, created) =
        send(&app, "POST", "/api/notebooks", Some("u1"), Some(notebook_body("nb"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["permissions"], "Owner");
    let id = created["id"].as_str().unwrap().to_string();
    let users_uri = format!("/api/notebooks/{}/users", id);
    let notebook_uri = format!("/api/notebooks/{}", id);

    let (status, _) = send(&app, "GET", &users_uri, Some("u2"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(
        &app,
        "PUT",
        &users_uri,
        Some("u1"),
        Some(json!([{ "id": "u2", "accountId": "acct", "permissions": "Read" }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, read) = send(&app, "GET", &notebook_uri, Some("u2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["permissions"], "Read");

    let (status, _) =
        send(&app, "PUT", &notebook_uri, Some("u2"), Some(notebook_body("mine"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &users_uri,
        Some("u1"),
        Some(json!([{ "id": "u3", "accountId": "acct", "permissions": "Owner" }])),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, listed) = send(&app, "GET", "/api/notebooks", Some("u2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &notebook_uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_notebook_is_bad_request() {
    let app = router();
    let mut body = notebook_body("nb");
    body["cells"][0]["input"]["body"] = json!("");

    let (status, _) = send(&app, "POST", "/api/notebooks", Some("u1"), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        send(&app, "POST", "/api/transformations", Some("u1"), Some(json!({ "name": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transformation_schedule_lifecycle() {
    let app = router();

    let (status, created) = send(
        &app,
        "POST",
        "/api/transformations",
        Some("u1"),
        Some(transformation_body("t")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["scheduled"], false);
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/transformations/{}", id);
    let schedule_uri = format!("{}/schedule", uri);
    let schedule = json!({ "event": { "category": "Timer", "name": "hourly", "value": "0 0 * * * *" } });

    let (status, _) = send(&app, "GET", &schedule_uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &schedule_uri, Some("u1"), Some(schedule.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &schedule_uri, Some("u1"), Some(schedule)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) =
        send(&app, "PUT", &uri, Some("u1"), Some(transformation_body("renamed"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fetched) = send(&app, "GET", &uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["scheduled"], true);
    assert_eq!(fetched["schedule"]["event"]["value"], "0 0 * * * *");

    let (status, _) = send(&app, "DELETE", &schedule_uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) =
        send(&app, "PUT", &uri, Some("u1"), Some(transformation_body("renamed"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "renamed");
    assert_eq!(updated["scheduled"], false);

    let (status, _) = send(&app, "DELETE", &uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_event_category() {
    let app = router();
    let (_, created) = send(
        &app,
        "POST",
        "/api/transformations",
        Some("u1"),
        Some(transformation_body("t")),
    )
    .await;
    let schedule_uri = format!("/api/transformations/{}/schedule", created["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        "POST",
        &schedule_uri,
        Some("u1"),
        Some(json!({ "event": { "category": "Webhook", "name": "hook" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Webhook"));
}

#[tokio::test]
async fn test_transformation_results() {
    let app = router();
    let (_, created) = send(
        &app,
        "POST",
        "/api/transformations",
        Some("u1"),
        Some(transformation_body("t")),
    )
    .await;
    let results_uri = format!("/api/transformations/{}/results", created["id"].as_str().unwrap());

    let (status, results) = send(&app, "GET", &results_uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results, json!([]));

    let (status, _) = send(
        &app,
        "GET",
        "/api/transformations/missing/results",
        Some("u1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
