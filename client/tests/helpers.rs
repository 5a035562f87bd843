//! Test helper utilities for client integration tests

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use futures_util::stream;
use tokio::sync::{Mutex, mpsc};

/// Feeds the body of the next optimizer response
pub type BodyFeed = mpsc::Sender<Bytes>;

#[derive(Clone)]
struct StreamState {
    bodies: Arc<Mutex<mpsc::Receiver<mpsc::Receiver<Bytes>>>>,
}

async fn optimize(State(state): State<StreamState>) -> Response {
    let Some(rx) = state.bodies.lock().await.recv().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });
    ([(header::CONTENT_TYPE, "text/event-stream; charset=utf-8")], Body::from_stream(body)).into_response()
}

/// Local optimizer endpoint whose response bodies are driven by the test.
/// Each call of the returned function prepares the body of one request.
pub async fn streaming_server() -> (SocketAddr, impl Fn() -> BodyFeed) {
    let (bodies_tx, bodies_rx) = mpsc::channel::<mpsc::Receiver<Bytes>>(8);
    let state = StreamState { bodies: Arc::new(Mutex::new(bodies_rx)) };
    let router = Router::new().route("/api/optimize", post(optimize)).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let next_body = move || {
        let (tx, rx) = mpsc::channel(16);
        bodies_tx.try_send(rx).unwrap();
        tx
    };
    (addr, next_body)
}
