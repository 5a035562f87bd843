//! Test helper utilities for webserver integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use serde_json::Value;
use shared::AuthUser;
use tower::ServiceExt;
use uuid::Uuid;
use webserver::WebServer;
use webserver::core::RelayConfig;
use webserver::traits::{MockBackendService, MockChatCompletionClient, MockImageGenerator};

pub type MockServer = WebServer<MockChatCompletionClient, MockImageGenerator, MockBackendService>;

pub const TOKEN: &str = "valid-token";

pub fn fast_relay_config() -> RelayConfig {
    RelayConfig {
        establish_timeout: Duration::from_millis(500),
        idle_timeout: Duration::from_millis(200),
        channel_capacity: 8,
    }
}

/// Webserver over the given mocks
pub fn mock_server(chat: MockChatCompletionClient, images: MockImageGenerator, backend: MockBackendService) -> MockServer {
    WebServer::new(chat, images, backend, fast_relay_config()).with_provider_name("mock")
}

pub fn test_user() -> AuthUser {
    AuthUser {
        id: Uuid::parse_str("00000000-0000-0000-0000-00000000000a").unwrap(),
        email: Some("user@example.com".to_string()),
    }
}

/// Backend mock that accepts [`TOKEN`] and rejects everything else
pub fn authenticating_backend() -> MockBackendService {
    let mut backend = MockBackendService::new();
    backend.expect_get_user().returning(|token| {
        if token == TOKEN {
            Ok(test_user())
        } else {
            Err(webserver::WebServerError::Unauthorized)
        }
    });
    backend
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authorized_json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    let mut request = json_request(method, uri, body);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {TOKEN}").parse().unwrap());
    request
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn authorized_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

/// Send one request through the router
pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Serve a router on an ephemeral local port
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Helper to wait for async conditions with timeout
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    loop {
        if condition().await {
            return true;
        }

        if start.elapsed() > timeout {
            return false;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
