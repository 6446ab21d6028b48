//! Chat session and message models
//!
//! Support chats pair a user with the single shared admin identity; the
//! admin side is the `"admin"` sentinel, not a per-account id, so every
//! admin connection shares the same session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The shared admin identity on the other side of every support chat
pub const ADMIN_SENTINEL: &str = "admin";

/// A chat session. At most one exists per (user_id, admin_id) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub admin_id: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted message. `seq` is the server-assigned append order;
/// history is always replayed in ascending `seq`.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub seq: i64,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of a message, shared by HTTP responses and the realtime
/// channel. Clients de-duplicate on `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageView {
    /// Project a stored message for the wire. A blank stored sender name
    /// falls back to "You"/"Admin" relative to the chat owner.
    pub fn project(message: &ChatMessage, chat_user_id: Uuid) -> Self {
        let sender_name = if message.sender_name.trim().is_empty() {
            if message.sender_id == chat_user_id.to_string() {
                "You".to_string()
            } else {
                "Admin".to_string()
            }
        } else {
            message.sender_name.clone()
        };

        MessageView {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id.clone(),
            sender_name,
            content: message.content.clone(),
            timestamp: message.created_at,
        }
    }
}

/// A chat with its full history, as returned to admin dashboards
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub messages: Vec<MessageView>,
}
