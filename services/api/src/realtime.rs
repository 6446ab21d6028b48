//! Realtime chat channel
//!
//! Delivery is at-least-once: history replay and live broadcast can
//! overlap around a join, so clients de-duplicate on message id. The
//! database is the source of truth; a failed broadcast is logged and
//! never fails the write that preceded it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{ADMIN_SENTINEL, Chat, MessageView};
use crate::repositories::ChatRepository;
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 64;

/// Events a client may send over the socket
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinChat {
        user_id: String,
        #[serde(default)]
        chat_id: Option<Uuid>,
        #[serde(default)]
        user_name: Option<String>,
    },
    SendMessage {
        chat_id: Uuid,
        content: String,
        sender_id: String,
        sender_name: String,
    },
}

/// Events the server pushes to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    ChatHistory { messages: Vec<MessageView> },
    NewMessage(MessageView),
    NewMessageNotification { chat_id: Uuid, sender_id: String },
    Error { message: String },
}

/// Per-chat broadcast channels plus a process-wide notification stream.
/// Lives in `AppState`; channels are created lazily on first subscribe
/// or publish.
#[derive(Clone)]
pub struct ChannelRegistry {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<ServerEvent>>>>,
    notifications: broadcast::Sender<ServerEvent>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            notifications,
        }
    }

    async fn sender(&self, chat_id: Uuid) -> broadcast::Sender<ServerEvent> {
        if let Some(sender) = self.channels.read().await.get(&chat_id) {
            return sender.clone();
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    pub async fn subscribe(&self, chat_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.sender(chat_id).await.subscribe()
    }

    /// Best-effort fan-out to a chat's subscribers. A chat with no
    /// listeners drops the event and its idle channel, so the map only
    /// holds chats someone is watching.
    pub async fn publish(&self, chat_id: Uuid, event: ServerEvent) {
        let sender = self.sender(chat_id).await;
        if sender.send(event).is_err() {
            let mut channels = self.channels.write().await;
            if channels
                .get(&chat_id)
                .is_some_and(|s| s.receiver_count() == 0)
            {
                channels.remove(&chat_id);
            }
        }
    }

    #[cfg(test)]
    async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    pub fn notify(&self, event: ServerEvent) {
        let _ = self.notifications.send(event);
    }

    pub fn notifications(&self) -> broadcast::Receiver<ServerEvent> {
        self.notifications.subscribe()
    }
}

/// Persist a message, then fan it out to the chat channel and the
/// notification stream. The write is authoritative; broadcast failures
/// only log.
pub async fn persist_and_broadcast(
    chats: &ChatRepository,
    registry: &ChannelRegistry,
    chat: &Chat,
    sender_id: &str,
    sender_name: &str,
    content: &str,
) -> Result<MessageView, ApiError> {
    let message = chats
        .append_message(chat.id, sender_id, sender_name, content)
        .await?;
    let view = MessageView::project(&message, chat.user_id);

    registry
        .publish(chat.id, ServerEvent::NewMessage(view.clone()))
        .await;
    registry.notify(ServerEvent::NewMessageNotification {
        chat_id: chat.id,
        sender_id: sender_id.to_string(),
    });

    Ok(view)
}

/// `GET /ws` upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut notifications = state.registry.notifications();

    // At most one chat subscription per connection; joining another chat
    // replaces it.
    let mut chat_rx: Option<broadcast::Receiver<ServerEvent>> = None;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else {
                    break;
                };
                let Message::Text(text) = message else {
                    continue;
                };

                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        if handle_client_event(&state, event, &mut sink, &mut chat_rx)
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Unreadable websocket event: {}", e);
                        let error = ServerEvent::Error {
                            message: "Unrecognized event".to_string(),
                        };
                        if send_event(&mut sink, &error).await.is_err() {
                            break;
                        }
                    }
                }
            }
            event = recv_or_pending(&mut chat_rx) => {
                match event {
                    Ok(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Websocket subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        chat_rx = None;
                    }
                }
            }
            event = notifications.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Notification subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn recv_or_pending(
    rx: &mut Option<broadcast::Receiver<ServerEvent>>,
) -> Result<ServerEvent, broadcast::error::RecvError> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_client_event(
    state: &AppState,
    event: ClientEvent,
    sink: &mut SplitSink<WebSocket, Message>,
    chat_rx: &mut Option<broadcast::Receiver<ServerEvent>>,
) -> Result<(), axum::Error> {
    match event {
        ClientEvent::JoinChat {
            user_id,
            chat_id,
            user_name,
        } => match resolve_chat(state, &user_id, chat_id, user_name.as_deref()).await {
            Ok(chat) => {
                info!("Websocket joined chat {}", chat.id);
                *chat_rx = Some(state.registry.subscribe(chat.id).await);

                // History replays to this connection only
                match state.chats.history(chat.id).await {
                    Ok(messages) => {
                        let history = ServerEvent::ChatHistory {
                            messages: messages
                                .iter()
                                .map(|m| MessageView::project(m, chat.user_id))
                                .collect(),
                        };
                        send_event(sink, &history).await?;
                    }
                    Err(e) => {
                        warn!("Failed to load chat history: {}", e);
                        let error = ServerEvent::Error {
                            message: "Failed to load chat history".to_string(),
                        };
                        send_event(sink, &error).await?;
                    }
                }
            }
            Err(message) => {
                send_event(sink, &ServerEvent::Error { message }).await?;
            }
        },
        ClientEvent::SendMessage {
            chat_id,
            content,
            sender_id,
            sender_name,
        } => {
            let chat = match state.chats.find_by_id(chat_id).await {
                Ok(Some(chat)) => chat,
                Ok(None) => {
                    let error = ServerEvent::Error {
                        message: "Chat not found".to_string(),
                    };
                    return send_event(sink, &error).await;
                }
                Err(e) => {
                    warn!("Chat lookup failed: {}", e);
                    let error = ServerEvent::Error {
                        message: "Failed to send message".to_string(),
                    };
                    return send_event(sink, &error).await;
                }
            };

            if let Err(e) = persist_and_broadcast(
                &state.chats,
                &state.registry,
                &chat,
                &sender_id,
                &sender_name,
                &content,
            )
            .await
            {
                warn!("Failed to persist websocket message: {}", e);
                let error = ServerEvent::Error {
                    message: "Failed to send message".to_string(),
                };
                send_event(sink, &error).await?;
            }
        }
    }

    Ok(())
}

/// The admin side joins an explicit chat; a user joins (or creates) the
/// single chat they share with the admin side.
async fn resolve_chat(
    state: &AppState,
    user_id: &str,
    chat_id: Option<Uuid>,
    user_name: Option<&str>,
) -> Result<Chat, String> {
    if user_id == ADMIN_SENTINEL {
        let chat_id = chat_id.ok_or_else(|| "chatId is required for admin joins".to_string())?;
        return match state.chats.find_by_id(chat_id).await {
            Ok(Some(chat)) => Ok(chat),
            Ok(None) => Err("Chat not found".to_string()),
            Err(e) => {
                warn!("Chat lookup failed: {}", e);
                Err("Failed to join chat".to_string())
            }
        };
    }

    let user_id = Uuid::parse_str(user_id).map_err(|_| "Invalid userId".to_string())?;

    match state.chats.find_for_user(user_id).await {
        Ok(Some(chat)) => Ok(chat),
        Ok(None) => {
            let name = user_name.unwrap_or("User");
            state.chats.start_or_get(user_id, name).await.map_err(|e| {
                warn!("Chat creation failed: {}", e);
                "Failed to join chat".to_string()
            })
        }
        Err(e) => {
            warn!("Chat lookup failed: {}", e);
            Err("Failed to join chat".to_string())
        }
    }
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            warn!("Failed to encode websocket event: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn view(chat_id: Uuid) -> MessageView {
        MessageView {
            id: Uuid::new_v4(),
            chat_id,
            sender_id: ADMIN_SENTINEL.to_string(),
            sender_name: "Admin".to_string(),
            content: "hello".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn all_subscribers_receive_published_events() {
        let registry = ChannelRegistry::new();
        let chat_id = Uuid::new_v4();

        let mut first = registry.subscribe(chat_id).await;
        let mut second = registry.subscribe(chat_id).await;

        registry
            .publish(chat_id, ServerEvent::NewMessage(view(chat_id)))
            .await;

        assert!(matches!(
            first.recv().await.unwrap(),
            ServerEvent::NewMessage(_)
        ));
        assert!(matches!(
            second.recv().await.unwrap(),
            ServerEvent::NewMessage(_)
        ));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_a_noop() {
        let registry = ChannelRegistry::new();
        registry
            .publish(Uuid::new_v4(), ServerEvent::NewMessage(view(Uuid::new_v4())))
            .await;
        assert_eq!(registry.channel_count().await, 0);
    }

    #[tokio::test]
    async fn idle_channels_are_pruned() {
        let registry = ChannelRegistry::new();
        let chat_id = Uuid::new_v4();

        let rx = registry.subscribe(chat_id).await;
        assert_eq!(registry.channel_count().await, 1);
        drop(rx);

        registry
            .publish(chat_id, ServerEvent::NewMessage(view(chat_id)))
            .await;
        assert_eq!(registry.channel_count().await, 0);

        // A later subscriber gets a fresh channel for the same chat
        let mut rx = registry.subscribe(chat_id).await;
        registry
            .publish(chat_id, ServerEvent::NewMessage(view(chat_id)))
            .await;
        assert!(matches!(
            rx.recv().await.unwrap(),
            ServerEvent::NewMessage(_)
        ));
        assert_eq!(registry.channel_count().await, 1);
    }

    #[tokio::test]
    async fn chats_are_isolated() {
        let registry = ChannelRegistry::new();
        let chat_a = Uuid::new_v4();
        let chat_b = Uuid::new_v4();

        let mut rx_a = registry.subscribe(chat_a).await;
        let _rx_b = registry.subscribe(chat_b).await;

        registry
            .publish(chat_a, ServerEvent::NewMessage(view(chat_a)))
            .await;

        let event = rx_a.recv().await.unwrap();
        match event {
            ServerEvent::NewMessage(message) => assert_eq!(message.chat_id, chat_a),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn notifications_reach_every_connection() {
        let registry = ChannelRegistry::new();
        let mut rx = registry.notifications();

        let chat_id = Uuid::new_v4();
        registry.notify(ServerEvent::NewMessageNotification {
            chat_id,
            sender_id: ADMIN_SENTINEL.to_string(),
        });

        match rx.recv().await.unwrap() {
            ServerEvent::NewMessageNotification { chat_id: got, .. } => {
                assert_eq!(got, chat_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn client_events_use_tagged_camel_case() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"joinChat","userId":"admin","chatId":"6f0f8c6e-0000-4000-8000-000000000000"}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::JoinChat { .. }));

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"sendMessage","chatId":"6f0f8c6e-0000-4000-8000-000000000000","content":"hi","senderId":"admin","senderName":"Admin"}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::SendMessage { .. }));
    }

    #[test]
    fn server_events_serialize_with_type_tag() {
        let chat_id = Uuid::new_v4();
        let json = serde_json::to_value(ServerEvent::NewMessageNotification {
            chat_id,
            sender_id: "admin".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "newMessageNotification");
        assert_eq!(json["senderId"], "admin");

        let json = serde_json::to_value(ServerEvent::NewMessage(view(chat_id))).unwrap();
        assert_eq!(json["type"], "newMessage");
        assert_eq!(json["content"], "hello");
    }
}
