//! HTTP-level tests driving the full router.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use backend::telemetry::REQUEST_ID_HEADER;
use rstest::{fixture, rstest};
use serde_json::{json, Value};
use shared::Task;
use tempfile::TempDir;
use tower::ServiceExt;

use common::{stepping_clock, Backend};

struct TestApp {
    router: Router,
    // keeps the static directory alive for the router's lifetime
    _static_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("index.html"), "<html>todos</html>").unwrap();
        let store = Backend::Sqlite
            .open(stepping_clock())
            .await
            .expect("sqlite is always available");
        Self {
            router: backend::app(store, static_dir.path()),
            _static_dir: static_dir,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create(&self, title: &str) -> Task {
        let (status, body) = self
            .send(Method::POST, "/api/todos", Some(json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_value(body).unwrap()
    }
}

#[fixture]
async fn app() -> TestApp {
    TestApp::new().await
}

#[rstest]
#[tokio::test]
async fn create_returns_201_with_wire_shape(#[future] app: TestApp) {
    let app = app.await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/todos",
            Some(json!({ "title": "Buy milk", "description": "2 litres" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 1);
    assert_eq!(body["title"], "Buy milk");
    assert_eq!(body["description"], "2 litres");
    assert_eq!(body["completed"], false);
    assert!(body["createdAt"].is_string());
    assert_eq!(body["createdAt"], body["updatedAt"]);
}

#[rstest]
#[case::missing(json!({ "description": "no title" }))]
#[case::empty(json!({ "title": "" }))]
#[case::null(json!({ "title": null }))]
#[tokio::test]
async fn create_without_title_is_400(#[future] app: TestApp, #[case] payload: Value) {
    let app = app.await;

    let (status, body) = app.send(Method::POST, "/api/todos", Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Title is required" }));
    let (_, list) = app.send(Method::GET, "/api/todos", None).await;
    assert_eq!(list, json!([]));
}

#[rstest]
#[tokio::test]
async fn malformed_json_is_400(#[future] app: TestApp) {
    let app = app.await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/todos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "Invalid request body" }));
}

#[rstest]
#[tokio::test]
async fn list_is_newest_first(#[future] app: TestApp) {
    let app = app.await;
    app.create("first").await;
    app.create("second").await;

    let (status, body) = app.send(Method::GET, "/api/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    let tasks: Vec<Task> = serde_json::from_value(body).unwrap();
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["second", "first"]);
}

#[rstest]
#[tokio::test]
async fn put_applies_only_sent_fields(#[future] app: TestApp) {
    let app = app.await;
    let (_, created) = app
        .send(
            Method::POST,
            "/api/todos",
            Some(json!({ "title": "Buy milk", "description": "2 litres" })),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/todos/{id}"),
            Some(json!({ "completed": true })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);
    assert_eq!(body["title"], "Buy milk");
    assert_eq!(body["description"], "2 litres");

    let (_, body) = app
        .send(
            Method::PUT,
            &format!("/api/todos/{id}"),
            Some(json!({ "description": null })),
        )
        .await;
    assert_eq!(body["description"], Value::Null);
    assert_eq!(body["completed"], true);

    let (status, fetched) = app.send(Method::GET, &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[rstest]
#[tokio::test]
async fn put_with_empty_title_is_400(#[future] app: TestApp) {
    let app = app.await;
    let task = app.create("Buy milk").await;

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/todos/{}", task.id),
            Some(json!({ "title": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Title is required" }));
}

#[rstest]
#[tokio::test]
async fn delete_then_update_is_404(#[future] app: TestApp) {
    let app = app.await;
    let task = app.create("Buy milk").await;
    let uri = format!("/api/todos/{}", task.id);

    let (status, body) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Todo deleted successfully" }));

    let (status, body) = app
        .send(Method::PUT, &uri, Some(json!({ "completed": false })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Todo not found" }));

    let (status, _) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[case::put(Method::PUT, Some(json!({ "completed": true })))]
#[case::delete(Method::DELETE, None)]
#[case::get(Method::GET, None)]
#[tokio::test]
async fn non_numeric_id_never_matches(
    #[future] app: TestApp,
    #[case] method: Method,
    #[case] body: Option<Value>,
) {
    let app = app.await;
    let task = app.create("Buy milk").await;

    let (status, response) = app.send(method, "/api/todos/abc", body).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response, json!({ "error": "Todo not found" }));
    let (_, fetched) = app
        .send(Method::GET, &format!("/api/todos/{}", task.id), None)
        .await;
    assert_eq!(fetched["completed"], false);
}

#[rstest]
#[tokio::test]
async fn responses_carry_a_request_id(#[future] app: TestApp) {
    let app = app.await;
    let request = Request::builder()
        .uri("/api/todos")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[rstest]
#[tokio::test]
async fn caller_request_id_is_echoed_back(#[future] app: TestApp) {
    let app = app.await;
    let request = Request::builder()
        .uri("/api/todos")
        .header(REQUEST_ID_HEADER, "trace-me-42")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me-42");
}

#[rstest]
#[tokio::test]
async fn frontend_is_served_outside_the_api(#[future] app: TestApp) {
    let app = app.await;
    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<html>todos</html>");
}
