//! Message delivery router
//!
//! Pushes a persisted message to every other participant that has a live
//! session. Best effort: offline recipients get nothing pushed and see the
//! message on their next history fetch. Nothing is queued or retried.

use std::sync::Arc;
use uuid::Uuid;

use campusnet_shared::{Chat, Message};

use super::events::ServerEvent;
use super::registry::SessionRegistry;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<Uuid>,
    pub offline: Vec<Uuid>,
}

#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Push `message` to the chat's online recipients, never to the sender
    pub async fn deliver(&self, message: &Message, chat: &Chat) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if let Some(recipient) = chat.other_participant(message.sender_id) {
            match self.registry.session_for(&recipient).await {
                None => report.offline.push(recipient),
                Some(conn) => {
                    let event = ServerEvent::NewMessage {
                        chat_id: chat.id,
                        message: message.clone(),
                    };
                    match conn.send(event) {
                        Ok(()) => report.delivered.push(recipient),
                        Err(_) => {
                            // Socket closed but not yet unregistered
                            tracing::warn!(
                                user_id = %recipient,
                                session_id = %conn.session_id,
                                "Failed to push message to closing connection"
                            );
                            report.offline.push(recipient);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            message_id = %message.id,
            chat_id = %chat.id,
            delivered = report.delivered.len(),
            offline = report.offline.len(),
            "Message delivery attempted"
        );

        report
    }
}
