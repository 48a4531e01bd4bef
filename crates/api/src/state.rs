//! Shared application state

use std::sync::Arc;

use crate::auth::{AuthState, JwtManager};
use crate::chat::{ChatLimits, ChatService, ReadReceiptTracker, RelationshipService};
use crate::config::Config;
use crate::store::{ChatStore, RelationshipStore};
use crate::websocket::WebSocketState;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt_manager: Arc<JwtManager>,
    pub chats: ChatService,
    pub relationships: RelationshipService,
    pub receipts: ReadReceiptTracker,
    pub ws_state: WebSocketState,
}

impl AppState {
    pub fn new(
        config: Config,
        chat_store: Arc<dyn ChatStore>,
        relationship_store: Arc<dyn RelationshipStore>,
    ) -> Self {
        let jwt_manager = Arc::new(JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours));
        let ws_state = WebSocketState::new();
        let relationships = RelationshipService::new(relationship_store);
        let limits = ChatLimits {
            message_max_length: config.message_max_length,
            history_default_limit: config.history_default_limit,
            history_max_limit: config.history_max_limit,
        };

        Self {
            chats: ChatService::new(
                Arc::clone(&chat_store),
                relationships.clone(),
                ws_state.router.clone(),
                limits,
            ),
            receipts: ReadReceiptTracker::new(chat_store),
            relationships,
            ws_state,
            jwt_manager,
            config: Arc::new(config),
        }
    }

    /// State for the auth middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: Arc::clone(&self.jwt_manager),
        }
    }
}
