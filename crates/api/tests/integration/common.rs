//! Shared fixtures

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use campusnet_api::{
    config::{Config, StoreBackend},
    routes::create_router,
    store::{MemoryStore, RelationshipStore},
    AppState,
};
use campusnet_shared::RelationshipState;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// How long a test waits for a frame before giving up
const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        client_urls: vec!["http://localhost:5173".to_string()],
        store_backend: StoreBackend::Memory,
        database_url: None,
        database_max_connections: 1,
        store_timeout_ms: 1000,
        store_max_retries: 1,
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiry_hours: 1,
        message_max_length: 5000,
        history_default_limit: 50,
        history_max_limit: 100,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone(), store.clone());
        Self { state, store }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn token(&self, user_id: Uuid) -> String {
        self.state
            .jwt_manager
            .generate_token(user_id)
            .expect("token generation")
    }

    /// Make two users connected without going through the request flow
    pub async fn connect_users(&self, a: Uuid, b: Uuid) {
        let swapped = self
            .store
            .compare_and_set_relationship(a, b, None, Some(RelationshipState::Connected))
            .await
            .expect("relationship write");
        assert!(swapped, "users were already related");
    }

    /// Serve the app on an ephemeral port, returning `host:port`
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr.to_string()
    }

    /// Open a socket for `user_id` and consume the `connected` frame
    pub async fn ws_connect(&self, addr: &str, user_id: Uuid) -> WsClient {
        let url = format!("ws://{}/ws?token={}", addr, self.token(user_id));
        let (mut ws, _) = tokio_tungstenite::connect_async(url).await.expect("ws connect");
        let hello = next_event(&mut ws).await;
        assert_eq!(hello["type"], "connected");
        ws
    }
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn send_json(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(WsMessage::Text(event.to_string())).await.unwrap();
}

/// Next JSON frame, failing the test on timeout
pub async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Skip frames until one of type `kind` arrives
pub async fn expect_event(ws: &mut WsClient, kind: &str) -> Value {
    loop {
        let event = next_event(ws).await;
        if event["type"] == kind {
            return event;
        }
    }
}

/// Round-trip a ping so every earlier frame from this socket has been handled
pub async fn barrier(ws: &mut WsClient) {
    send_event(ws, serde_json::json!({"type": "ping"})).await;
    expect_event(ws, "pong").await;
}

/// Register and wait for the online snapshot
pub async fn register(ws: &mut WsClient, user_id: Uuid) -> Value {
    send_event(ws, serde_json::json!({"type": "register", "userId": user_id})).await;
    expect_event(ws, "onlineUsers").await
}
