//! Chat lifecycle through the services and realtime state, without sockets

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use campusnet_api::websocket::{connection::Connection, events::ServerEvent};
use campusnet_shared::MessageType;

use crate::common::TestApp;

async fn online(
    app: &TestApp,
    user_id: Uuid,
) -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = app.state.ws_state.add_connection(Connection::new(user_id, tx)).await;
    app.state
        .ws_state
        .register(Some(&user_id.to_string()), &conn)
        .await
        .expect("registration");
    (conn, rx)
}

fn new_messages(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<String> {
    let mut contents = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ServerEvent::NewMessage { message, .. } = event {
            contents.push(message.content);
        }
    }
    contents
}

#[tokio::test]
async fn test_offline_recipient_reads_history_later() {
    let app = TestApp::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    app.connect_users(alice, bob).await;

    let (_alice_conn, _alice_rx) = online(&app, alice).await;
    let (bob_conn, mut bob_rx) = online(&app, bob).await;

    let chat = app.state.chats.open_chat(alice, bob).await.unwrap();

    let sent = app
        .state
        .chats
        .send_message(chat.id, alice, "hi".into(), MessageType::Text)
        .await
        .unwrap();
    assert_eq!(sent.delivery.delivered, vec![bob]);
    assert_eq!(new_messages(&mut bob_rx), vec!["hi"]);

    app.state.ws_state.remove_connection(&bob_conn.session_id).await;
    assert!(!app.state.ws_state.registry.is_online(&bob).await);

    let sent = app
        .state
        .chats
        .send_message(chat.id, alice, "yo".into(), MessageType::Text)
        .await
        .unwrap();
    assert!(sent.delivery.delivered.is_empty());
    assert_eq!(sent.delivery.offline, vec![bob]);
    assert!(new_messages(&mut bob_rx).is_empty());

    let page = app.state.chats.history(chat.id, bob, None, None).await.unwrap();
    let contents: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "yo"]);
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_concurrent_open_resolves_to_one_chat() {
    let app = TestApp::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    app.connect_users(alice, bob).await;

    let chats = app.state.chats.clone();
    let other = app.state.chats.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { chats.open_chat(alice, bob).await }),
        tokio::spawn(async move { other.open_chat(bob, alice).await }),
    );

    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(app.store.chat_count().await, 1);
}

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let app = TestApp::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    app.connect_users(alice, bob).await;
    let chat = app.state.chats.open_chat(alice, bob).await.unwrap();

    for text in ["one", "two"] {
        app.state
            .chats
            .send_message(chat.id, alice, text.into(), MessageType::Text)
            .await
            .unwrap();
    }

    assert_eq!(app.state.receipts.mark_read(chat.id, bob).await.unwrap(), 2);
    assert_eq!(app.state.receipts.mark_read(chat.id, bob).await.unwrap(), 0);

    let page = app.state.chats.history(chat.id, bob, None, None).await.unwrap();
    for message in &page.messages {
        let bob_receipts = message.read_by.iter().filter(|r| r.user_id == bob).count();
        assert_eq!(bob_receipts, 1);
        assert!(message.is_read_by(alice));
    }
}

#[tokio::test]
async fn test_latest_registration_receives_pushes() {
    let app = TestApp::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    app.connect_users(alice, bob).await;
    let chat = app.state.chats.open_chat(alice, bob).await.unwrap();

    let (old_conn, mut old_rx) = online(&app, bob).await;
    let (_new_conn, mut new_rx) = online(&app, bob).await;

    app.state
        .chats
        .send_message(chat.id, alice, "which tab?".into(), MessageType::Text)
        .await
        .unwrap();
    assert!(new_messages(&mut old_rx).is_empty());
    assert_eq!(new_messages(&mut new_rx), vec!["which tab?"]);

    // The superseded tab closing leaves bob online
    app.state.ws_state.remove_connection(&old_conn.session_id).await;
    assert!(app.state.ws_state.registry.is_online(&bob).await);
}
