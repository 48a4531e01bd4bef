//! Realtime behaviour over real WebSocket connections

use std::time::Duration;

use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::{barrier, expect_event, next_event, register, send_event, send_json, TestApp};

#[tokio::test]
async fn test_upgrade_requires_valid_token() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let result = tokio_tungstenite::connect_async(format!("ws://{}/ws?token=garbage", addr)).await;
    assert!(result.is_err());

    let result = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_presence_online_snapshot_and_offline() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let mut alice_ws = app.ws_connect(&addr, alice).await;
    let snapshot = register(&mut alice_ws, alice).await;
    assert_eq!(snapshot["userIds"], json!([alice]));

    let mut bob_ws = app.ws_connect(&addr, bob).await;
    let snapshot = register(&mut bob_ws, bob).await;
    assert_eq!(snapshot["userIds"].as_array().unwrap().len(), 2);

    let online = expect_event(&mut alice_ws, "userOnline").await;
    assert_eq!(online["userId"], bob.to_string());

    send_event(&mut alice_ws, json!({"type": "getOnlineStatus", "userIds": [bob, Uuid::new_v4()]})).await;
    let status = expect_event(&mut alice_ws, "onlineStatus").await;
    assert_eq!(status["statuses"][bob.to_string()], true);

    bob_ws.close(None).await.unwrap();
    let offline = expect_event(&mut alice_ws, "userOffline").await;
    assert_eq!(offline["userId"], bob.to_string());
    assert!(!app.state.ws_state.registry.is_online(&bob).await);
}

#[tokio::test]
async fn test_register_for_other_user_is_ignored() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let alice = Uuid::new_v4();

    let mut ws = app.ws_connect(&addr, alice).await;
    send_event(&mut ws, json!({"type": "register", "userId": Uuid::new_v4()})).await;
    send_event(&mut ws, json!({"type": "register", "userId": ""})).await;
    send_event(&mut ws, json!({"type": "register"})).await;

    // Nothing but the pong comes back
    send_event(&mut ws, json!({"type": "ping"})).await;
    assert_eq!(next_event(&mut ws).await["type"], "pong");
    assert_eq!(app.state.ws_state.registry.online_count().await, 0);
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_socket_survives() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut ws = app.ws_connect(&addr, Uuid::new_v4()).await;

    send_event(&mut ws, json!({"type": "launchRockets"})).await;
    let error = next_event(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], "Invalid event format");

    barrier(&mut ws).await;
}

#[tokio::test]
async fn test_typing_reaches_room_members_only() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let mallory = Uuid::new_v4();
    app.connect_users(alice, bob).await;
    let chat = app.state.chats.open_chat(alice, bob).await.unwrap();

    let mut alice_ws = app.ws_connect(&addr, alice).await;
    let mut bob_ws = app.ws_connect(&addr, bob).await;
    let mut mallory_ws = app.ws_connect(&addr, mallory).await;

    for ws in [&mut alice_ws, &mut bob_ws] {
        send_event(ws, json!({"type": "joinChat", "chatId": chat.id})).await;
        barrier(ws).await;
    }

    // A non-participant cannot join
    send_event(&mut mallory_ws, json!({"type": "joinChat", "chatId": chat.id})).await;
    let denied = next_event(&mut mallory_ws).await;
    assert_eq!(denied["type"], "error");
    assert_eq!(denied["message"], "Access denied to chat");

    send_event(&mut alice_ws, json!({"type": "typing", "chatId": chat.id, "userId": alice})).await;
    let typing = next_event(&mut bob_ws).await;
    assert_eq!(typing["type"], "userTyping");
    assert_eq!(typing["userId"], alice.to_string());

    send_event(&mut alice_ws, json!({"type": "stopTyping", "chatId": chat.id, "userId": alice})).await;
    let stopped = next_event(&mut bob_ws).await;
    assert_eq!(stopped["type"], "userStoppedTyping");

    // The sender never hears its own typing events
    send_event(&mut alice_ws, json!({"type": "ping"})).await;
    assert_eq!(next_event(&mut alice_ws).await["type"], "pong");

    // Typing is never persisted
    let page = app.state.chats.history(chat.id, bob, None, None).await.unwrap();
    assert!(page.messages.is_empty());

    // After leaving, bob no longer receives typing
    send_event(&mut bob_ws, json!({"type": "leaveChat", "chatId": chat.id})).await;
    barrier(&mut bob_ws).await;
    send_event(&mut alice_ws, json!({"type": "typing", "chatId": chat.id, "userId": alice})).await;
    barrier(&mut alice_ws).await;
    send_event(&mut bob_ws, json!({"type": "ping"})).await;
    assert_eq!(next_event(&mut bob_ws).await["type"], "pong");
    assert_eq!(app.state.ws_state.rooms.get_room_size(&chat.id).await, 1);
}

#[tokio::test]
async fn test_message_sent_over_http_is_pushed_to_recipient() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    app.connect_users(alice, bob).await;
    let chat = app.state.chats.open_chat(alice, bob).await.unwrap();

    let mut alice_ws = app.ws_connect(&addr, alice).await;
    register(&mut alice_ws, alice).await;
    let mut bob_ws = app.ws_connect(&addr, bob).await;
    register(&mut bob_ws, bob).await;

    let response = app
        .router()
        .oneshot(send_json(
            "POST",
            &format!("/api/v1/chats/{}/messages", chat.id),
            &app.token(alice),
            json!({"content": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let pushed = expect_event(&mut bob_ws, "newMessage").await;
    assert_eq!(pushed["chatId"], chat.id.to_string());
    assert_eq!(pushed["message"]["content"], "hi");
    assert_eq!(pushed["message"]["senderId"], alice.to_string());

    // Teardown removes every trace of the session
    drop(bob_ws);
    expect_event(&mut alice_ws, "userOffline").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = app.state.ws_state.get_stats().await;
    assert_eq!(stats.online_users, 1);
    assert_eq!(stats.active_connections, 1);
}
