mod common;

use std::sync::Arc;
use std::time::Duration;

use api_dispatch::config::DispatchConfig;
use api_dispatch::handlers::HandlerStrategy;
use api_dispatch::http::{Request, Response};
use api_dispatch::{Dispatcher, HttpServer, Shutdown};
use axum::http::StatusCode;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use common::{empty, json, send};

#[derive(Debug)]
struct Health;

impl HandlerStrategy for Health {
    fn name(&self) -> &'static str {
        "health"
    }

    fn can_handle(&self, request: &Request) -> bool {
        request.path() == "/health"
    }

    fn handle(&self, _request: &Request) -> Response {
        Response::json(json!({"status": "ok"}), StatusCode::OK)
    }

    fn priority(&self) -> i32 {
        100
    }
}

#[tokio::test]
async fn test_unclaimed_request_is_404() {
    let server = HttpServer::new(&DispatchConfig::default());
    let response = send(&server.router(), empty("TRACE", "/users")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.json();
    assert_eq!(body["error"]["code"], 404);
    assert_eq!(
        body["error"]["message"],
        "No suitable handler found for TRACE /users"
    );
}

#[tokio::test]
async fn test_request_id_generated_and_propagated() {
    let server = HttpServer::new(&DispatchConfig::default());
    let router = server.router();

    let generated = send(&router, empty("GET", "/users")).await;
    assert!(generated.header("x-request-id").is_some_and(|id| !id.is_empty()));

    let request = axum::http::Request::builder()
        .uri("/users")
        .header("x-request-id", "req-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let echoed = send(&router, request).await;
    assert_eq!(echoed.header("x-request-id"), Some("req-42"));
}

#[tokio::test]
async fn test_marker_and_content_type_headers() {
    let server = HttpServer::new(&DispatchConfig::default());
    let response = send(&server.router(), empty("GET", "/users/1")).await;

    assert_eq!(response.header("content-type"), Some("application/json"));
    assert!(response
        .header("x-powered-by")
        .is_some_and(|v| v.starts_with("api-dispatch/")));
    assert_eq!(response.json()["data"]["id"], 1);
}

#[tokio::test]
async fn test_cors_follows_config() {
    let enabled = HttpServer::new(&DispatchConfig::default());
    let response = send(&enabled.router(), empty("OPTIONS", "/users")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(response.header("access-control-max-age"), Some("86400"));
    assert!(response.body.is_empty());

    let mut config = DispatchConfig::default();
    config.cors.enabled = false;
    let disabled = HttpServer::new(&config);
    let response = send(&disabled.router(), empty("GET", "/users")).await;
    assert!(response.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let mut config = DispatchConfig::default();
    config.listener.max_body_bytes = 16;
    let server = HttpServer::new(&config);

    let response = send(
        &server.router(),
        json("POST", "/users", json!({"name": "a name well past sixteen bytes"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_swapped_dispatcher_takes_effect() {
    let server = HttpServer::new(&DispatchConfig::default());
    let router = server.router();

    let before = send(&router, empty("GET", "/users")).await;
    assert!(before.header("access-control-allow-origin").is_some());

    let mut reloaded = DispatchConfig::default();
    reloaded.cors.enabled = false;
    server
        .dispatcher()
        .store(Arc::new(Dispatcher::from_config(&reloaded)));

    let after = send(&router, empty("GET", "/users")).await;
    assert!(after.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_custom_strategy_outranks_builtins() {
    let config = DispatchConfig::default();
    let dispatcher = Dispatcher::from_config(&config);
    dispatcher.register(Arc::new(Health));
    let server = HttpServer::with_dispatcher(&config, dispatcher);
    let router = server.router();

    let health = send(&router, empty("GET", "/health")).await;
    assert_eq!(health.json(), json!({"status": "ok"}));

    let users = send(&router, empty("GET", "/users")).await;
    assert_eq!(users.header("x-api-paradigm"), Some("rest"));
}

#[tokio::test]
async fn test_diagnostics_off_by_default() {
    let server = HttpServer::new(&DispatchConfig::default());
    let response = send(&server.router(), empty("PUT", "/users")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].get("debug").is_none());
}

#[tokio::test]
async fn test_diagnostics_attach_debug_detail() {
    let mut config = DispatchConfig::default();
    config.diagnostics.enabled = true;
    let server = HttpServer::new(&config);
    let response = send(&server.router(), empty("PUT", "/users")).await;

    let debug = &response.json()["error"]["debug"];
    assert_eq!(debug["type"], "RestError::MissingId");
    assert!(debug["file"].as_str().unwrap().ends_with("rest.rs"));
    assert_eq!(debug["message"], "ID required for update");
}

async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    raw.to_ascii_lowercase()
}

#[tokio::test]
async fn test_serves_over_tcp_reloads_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (reload_tx, reloads) = mpsc::unbounded_channel();

    let server = HttpServer::new(&DispatchConfig::default());
    let serving = tokio::spawn(server.run(listener, reloads, shutdown.subscribe()));

    let request = "GET /users HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
    let before = raw_request(addr, request).await;
    assert!(before.starts_with("http/1.1 200"));
    assert!(before.contains("x-api-paradigm: rest"));
    assert!(before.contains("access-control-allow-origin: *"));

    let mut reloaded = DispatchConfig::default();
    reloaded.cors.enabled = false;
    reload_tx.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = raw_request(addr, request).await;
    assert!(after.starts_with("http/1.1 200"));
    assert!(!after.contains("access-control-allow-origin"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
