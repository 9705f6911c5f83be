//! End-to-end tests for the privilege search API

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use kubeguard_privilege::{
    BindingScope, BindingSource, ClusterRole, GrantFetcher, InMemoryRbacClient, PolicyRule,
    PrivilegeError, QueryOptions, Result, Role, RoleBinding, RoleRef, Subject,
};
use kubeguard_server::{routes, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn developer_app() -> Router {
    let client = InMemoryRbacClient::new();
    client
        .insert_role(Role::new("default", "editor").with_rule(
            PolicyRule::new(["get", "list"]).with_api_groups([""]).with_resources(["pods"]),
        ))
        .await;
    client
        .insert_binding(
            RoleBinding::new("default", "dev-editor", RoleRef::role("editor"))
                .with_subject(Subject::user("developer")),
        )
        .await;

    let state = AppState::new(Arc::new(client), QueryOptions::default());
    routes::create_router(state, Duration::from_secs(5))
}

fn search(method: Method, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(routes::SEARCH_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_search_json() {
    let app = developer_app().await;
    let response = app
        .oneshot(search(Method::POST, json!({"subjects": ["developer", "unknown"]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body[0]["subject"], "developer");
    assert_eq!(body[0]["roles"][0]["metadata"]["name"], "editor");
    assert_eq!(body[0]["clusterroles"], Value::Null);
    assert_eq!(body[1], json!({"subject": "unknown", "roles": null, "clusterroles": null}));
}

#[tokio::test]
async fn test_search_yaml_over_get() {
    let app = developer_app().await;
    let response = app
        .oneshot(search(Method::GET, json!({"subjects": ["unknown"], "format": "YAML"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-yaml"
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body, "- subject: unknown\n  roles: null\n  clusterroles: null\n");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = developer_app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri(routes::SEARCH_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"subjects\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() {
    let app = developer_app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri(routes::SEARCH_PATH)
        .body(Body::from(json!({"subjects": ["developer"]}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], 415);
}

#[tokio::test]
async fn test_strict_pattern_rejected() {
    let options = QueryOptions {
        strict_patterns: true,
        ..Default::default()
    };
    let state = AppState::new(Arc::new(InMemoryRbacClient::new()), options);
    let app = routes::create_router(state, Duration::from_secs(5));

    let response = app
        .oneshot(search(Method::POST, json!({"subjects": ["dev("]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

struct UnreachableCluster;

#[async_trait]
impl BindingSource for UnreachableCluster {
    async fn list_bindings(&self, _scope: &BindingScope) -> Result<Vec<RoleBinding>> {
        Err(PrivilegeError::SourceUnavailable(
            "connection refused".to_string(),
        ))
    }
}

#[async_trait]
impl GrantFetcher for UnreachableCluster {
    async fn get_role(&self, _namespace: &str, _name: &str) -> Result<Option<Role>> {
        Ok(None)
    }

    async fn get_cluster_role(&self, _name: &str) -> Result<Option<ClusterRole>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_unavailable_source_is_server_error() {
    let state = AppState::new(Arc::new(UnreachableCluster), QueryOptions::default());
    let app = routes::create_router(state, Duration::from_secs(5));

    let response = app
        .oneshot(search(Method::POST, json!({"subjects": ["developer"]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_health() {
    let app = developer_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
}
