//! REST surface through the full router

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::{body_json, empty, get, send_json, TestApp};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let router = app.router();

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");

    for uri in ["/health/live", "/health/ready"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = TestApp::new();
    let router = app.router();

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/api/v1/chats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(get("/api/v1/chats", "not-a-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_cookie_authentication() {
    let app = TestApp::new();
    let token = app.token(Uuid::new_v4());

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/chats")
                .header("cookie", format!("jwt={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_connection_request_flow() {
    let app = TestApp::new();
    let router = app.router();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let alice_token = app.token(alice);
    let bob_token = app.token(bob);

    let response = router
        .clone()
        .oneshot(empty("POST", &format!("/api/v1/connections/{}/request", bob), &alice_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "pending_sent");

    // Requester cannot accept their own request
    let response = router
        .clone()
        .oneshot(empty("POST", &format!("/api/v1/connections/{}/accept", bob), &alice_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/connections/{}/status", alice), &bob_token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "pending_received");

    let response = router
        .clone()
        .oneshot(empty("POST", &format!("/api/v1/connections/{}/accept", alice), &bob_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "connected");

    let response = router
        .clone()
        .oneshot(get("/api/v1/connections", &alice_token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["userIds"], json!([bob]));

    let response = router
        .clone()
        .oneshot(empty("DELETE", &format!("/api/v1/connections/{}", alice), &bob_token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "none");

    let response = router
        .clone()
        .oneshot(empty("POST", &format!("/api/v1/connections/{}/request", alice), &alice_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_requires_connection() {
    let app = TestApp::new();
    let alice = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let token = app.token(alice);

    let response = app
        .router()
        .oneshot(get(&format!("/api/v1/chats/user/{}", stranger), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["code"], "FORBIDDEN");

    let response = app
        .router()
        .oneshot(get(&format!("/api/v1/chats/user/{}", alice), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_history_and_read_over_http() {
    let app = TestApp::new();
    let router = app.router();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let mallory = Uuid::new_v4();
    app.connect_users(alice, bob).await;
    let alice_token = app.token(alice);
    let bob_token = app.token(bob);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/chats/user/{}", bob), &alice_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chat = body_json(response).await;
    let chat_id = chat["id"].as_str().unwrap().to_string();
    let messages_uri = format!("/api/v1/chats/{}/messages", chat_id);

    for content in ["first", "second", "third"] {
        let response = router
            .clone()
            .oneshot(send_json("POST", &messages_uri, &alice_token, json!({ "content": content })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let message = body_json(response).await;
        assert_eq!(message["messageType"], "text");
        assert_eq!(message["readBy"][0]["userId"], alice.to_string());
    }

    let response = router
        .clone()
        .oneshot(send_json("POST", &messages_uri, &alice_token, json!({ "content": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");

    let response = router
        .clone()
        .oneshot(send_json(
            "POST",
            &messages_uri,
            &app.token(mallory),
            json!({ "content": "let me in" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .clone()
        .oneshot(get(&format!("{}?page=1&limit=2", messages_uri), &bob_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["messages"][0]["content"], "second");
    assert_eq!(page["messages"][1]["content"], "third");
    assert_eq!(page["hasMore"], true);

    let read_uri = format!("/api/v1/chats/{}/read", chat_id);
    let response = router
        .clone()
        .oneshot(empty("PATCH", &read_uri, &bob_token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["updated"], 3);
    let response = router
        .clone()
        .oneshot(empty("PATCH", &read_uri, &bob_token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["updated"], 0);

    let response = router
        .clone()
        .oneshot(get("/api/v1/chats", &bob_token))
        .await
        .unwrap();
    let chats = body_json(response).await;
    assert_eq!(chats.as_array().unwrap().len(), 1);
    assert_eq!(chats[0]["id"], chat_id.as_str());

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/chats/{}/messages", Uuid::new_v4()), &bob_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_input_uses_error_envelope() {
    let app = TestApp::new();
    let router = app.router();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    app.connect_users(alice, bob).await;
    let chat = app.state.chats.open_chat(alice, bob).await.unwrap();
    let token = app.token(alice);
    let messages_uri = format!("/api/v1/chats/{}/messages", chat.id);

    let bodies = [json!({}), json!({ "content": "x", "messageType": "video" })];
    for body in bodies {
        let response = router
            .clone()
            .oneshot(send_json("POST", &messages_uri, &token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    let uris = [
        "/api/v1/chats/not-a-uuid/messages".to_string(),
        "/api/v1/connections/not-a-uuid/status".to_string(),
        format!("{}?limit=lots", messages_uri),
    ];
    for uri in uris {
        let response = router.clone().oneshot(get(&uri, &token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    // Nothing was persisted by the rejected sends
    let page = app.state.chats.history(chat.id, alice, None, None).await.unwrap();
    assert!(page.messages.is_empty());
}
