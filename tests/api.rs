//! End-to-end HTTP behavior of the message API over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use hello_service::api::{create_router, AppState};
use hello_service::store::{MemoryStore, MessageStore};

struct TestApp {
    router: Router,
    store: MemoryStore,
}

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let router = create_router(AppState::new(Arc::new(store.clone())));
        Self { router, store }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(text) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(text.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            content_type,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, body: &str) -> TestResponse {
        self.send(Method::POST, "/hello", Some(body)).await
    }

    async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }
}

#[tokio::test]
async fn create_list_delete_scenario() {
    let app = TestApp::new();

    let created = app.post(r#"{"message":"hi"}"#).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body, r#"{"data":{"id":1,"message":"hi"}}"#);

    let listed = app.get("/hello").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body, r#"{"data":[{"id":1,"message":"hi"}]}"#);

    let deleted = app.delete("/hello/1").await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(deleted.body, "");

    let fetched = app.get("/hello/1").await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);
    assert_eq!(fetched.body, r#"{"error":"Not found"}"#);
}

#[tokio::test]
async fn created_message_reads_back_identically() {
    let app = TestApp::new();

    for text in ["hello", "  padded  ", "üñíçødé ✓", "with \"quotes\" and <tags>"] {
        let created = app.post(&json!({ "message": text }).to_string()).await;
        assert_eq!(created.status, StatusCode::CREATED);
        let id = created.json()["data"]["id"].as_i64().unwrap();

        let fetched = app.get(&format!("/hello/{id}")).await;
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.json(), json!({ "data": { "id": id, "message": text } }));
    }
}

#[tokio::test]
async fn list_is_in_insertion_order() {
    let app = TestApp::new();
    for text in ["first", "second", "third"] {
        app.post(&json!({ "message": text }).to_string()).await;
    }

    let listed = app.get("/hello").await.json();
    let texts: Vec<&str> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["message"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn empty_list_is_an_empty_array() {
    let app = TestApp::new();
    assert_eq!(app.get("/hello").await.body, r#"{"data":[]}"#);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::new();
    app.post(r#"{"message":"only one"}"#).await;

    for uri in ["/hello/2", "/hello/999999", "/hello/9223372036854775807"] {
        assert_eq!(app.get(uri).await.status, StatusCode::NOT_FOUND, "GET {uri}");
        assert_eq!(app.delete(uri).await.status, StatusCode::NOT_FOUND, "DELETE {uri}");
    }
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = TestApp::new();
    app.post(r#"{"message":"x"}"#).await;

    for uri in [
        "/hello/",
        "/hello//",
        "/hello/abc",
        "/hello/0",
        "/hello/-1",
        "/hello/1.5",
        "/hello/1/2",
        "/hello/%20",
    ] {
        let get = app.get(uri).await;
        assert_eq!(get.status, StatusCode::BAD_REQUEST, "GET {uri}");
        assert_eq!(get.body, r#"{"error":"ID must be a positive integer"}"#);

        let delete = app.delete(uri).await;
        assert_eq!(delete.status, StatusCode::BAD_REQUEST, "DELETE {uri}");
    }
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn trailing_slash_on_id_is_accepted() {
    let app = TestApp::new();
    app.post(r#"{"message":"slash"}"#).await;

    let fetched = app.get("/hello/1/").await;
    assert_eq!(fetched.status, StatusCode::OK);
}

#[tokio::test]
async fn delete_removes_from_list_and_second_delete_is_not_found() {
    let app = TestApp::new();
    app.post(r#"{"message":"keep"}"#).await;
    app.post(r#"{"message":"drop"}"#).await;

    assert_eq!(app.delete("/hello/2").await.status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.get("/hello").await.body,
        r#"{"data":[{"id":1,"message":"keep"}]}"#
    );

    let again = app.delete("/hello/2").await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.body, r#"{"error":"Not found"}"#);
}

#[tokio::test]
async fn empty_messages_are_rejected_without_mutation() {
    let app = TestApp::new();

    for body in [
        r#"{"message":""}"#,
        r#"{"message":"   "}"#,
        r#"{"message":"\t\n"}"#,
        r#"{"message":null}"#,
        r#"{}"#,
    ] {
        let response = app.post(body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.body, r#"{"error":"Message is required"}"#);
    }
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let app = TestApp::new();

    for body in [
        "",
        "not json",
        r#"{"message":"hi""#,
        r#"{"message":5}"#,
        r#"["hi"]"#,
        r#"{"message":"hi","id":7}"#,
        r#"{"message":"hi"} trailing"#,
    ] {
        let response = app.post(body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.body, r#"{"error":"Invalid JSON payload"}"#);
    }
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn over_long_messages_are_rejected() {
    let app = TestApp::new();
    let body = json!({ "message": "a".repeat(256) }).to_string();

    let response = app.post(&body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        r#"{"error":"Message must be at most 255 characters"}"#
    );
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn store_failures_are_opaque_500s() {
    let app = TestApp::new();
    app.post(r#"{"message":"existing"}"#).await;
    app.store.set_fail_writes(true);

    let created = app.post(r#"{"message":"new"}"#).await;
    assert_eq!(created.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(created.body, r#"{"error":"DB error"}"#);

    let deleted = app.delete("/hello/1").await;
    assert_eq!(deleted.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(deleted.body, r#"{"error":"DB error"}"#);

    app.store.set_available(false);
    let listed = app.get("/hello").await;
    assert_eq!(listed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(listed.body, r#"{"error":"DB error"}"#);
}

#[tokio::test]
async fn health_follows_store_availability() {
    let app = TestApp::new();

    let up = app.get("/health").await;
    assert_eq!(up.status, StatusCode::OK);
    assert_eq!(up.body, r#"{"data":{"status":"ok"}}"#);

    app.store.set_available(false);
    let down = app.get("/health").await;
    assert_eq!(down.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(down.body, r#"{"error":"DB not available"}"#);

    app.store.set_available(true);
    assert_eq!(app.get("/health").await.status, StatusCode::OK);
}

#[tokio::test]
async fn unsupported_methods_get_json_405() {
    let app = TestApp::new();
    app.post(r#"{"message":"stay"}"#).await;

    for (method, uri) in [
        (Method::PUT, "/hello"),
        (Method::DELETE, "/hello"),
        (Method::PATCH, "/hello/1"),
        (Method::POST, "/hello/1"),
        (Method::PUT, "/hello/"),
        (Method::POST, "/health"),
    ] {
        let response = app.send(method.clone(), uri, None).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(response.body, r#"{"error":"Method not allowed"}"#);
    }
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn every_body_is_json() {
    let app = TestApp::new();
    app.post(r#"{"message":"hi"}"#).await;

    let responses = [
        app.get("/hello").await,
        app.get("/hello/1").await,
        app.get("/hello/abc").await,
        app.get("/hello/42").await,
        app.post("nope").await,
        app.get("/health").await,
        app.delete("/hello/1").await,
    ];
    for response in responses {
        assert_eq!(
            response.content_type.as_deref(),
            Some("application/json"),
            "status {}",
            response.status
        );
    }
}
