//! Chat repository

use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::{ADMIN_SENTINEL, Chat, ChatMessage, ChatView, MessageView};

const CHAT_COLUMNS: &str = "id, user_id, user_name, admin_id, created_at";
const MESSAGE_COLUMNS: &str = "id, chat_id, seq, sender_id, sender_name, content, created_at";

fn map_chat(row: &PgRow) -> Chat {
    Chat {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        admin_id: row.get("admin_id"),
        created_at: row.get("created_at"),
    }
}

fn map_message(row: &PgRow) -> ChatMessage {
    ChatMessage {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        seq: row.get("seq"),
        sender_id: row.get("sender_id"),
        sender_name: row.get("sender_name"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find or create the chat between a user and the admin side.
    /// Insert-then-select under the (user_id, admin_id) unique key, so
    /// two concurrent starts converge on one row.
    pub async fn start_or_get(&self, user_id: Uuid, user_name: &str) -> Result<Chat, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO chats (user_id, user_name, admin_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, admin_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(user_name)
        .bind(ADMIN_SENTINEL)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = $1 AND admin_id = $2"
        ))
        .bind(user_id)
        .bind(ADMIN_SENTINEL)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_chat(&row))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Chat>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_chat))
    }

    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Option<Chat>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = $1 AND admin_id = $2"
        ))
        .bind(user_id)
        .bind(ADMIN_SENTINEL)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_chat))
    }

    /// Append a message; the database assigns id, timestamp and the
    /// sequence number that fixes replay order.
    pub async fn append_message(
        &self,
        chat_id: Uuid,
        sender_id: &str,
        sender_name: &str,
        content: &str,
    ) -> Result<ChatMessage, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO chat_messages (chat_id, sender_id, sender_name, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(chat_id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_message(&row))
    }

    /// Full history in append order
    pub async fn history(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_id = $1 ORDER BY seq ASC"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_message).collect())
    }

    /// Every chat with its full message list, for the admin dashboard
    pub async fn list_all_with_messages(&self) -> Result<Vec<ChatView>, sqlx::Error> {
        let chat_rows = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(chat_rows.len());
        for row in &chat_rows {
            let chat = map_chat(row);
            let messages = self.history(chat.id).await?;
            views.push(ChatView {
                id: chat.id,
                user_id: chat.user_id,
                user_name: chat.user_name.clone(),
                messages: messages
                    .iter()
                    .map(|m| MessageView::project(m, chat.user_id))
                    .collect(),
            });
        }

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, test_pool};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn concurrent_starts_converge_on_one_chat() {
        let Some(pool) = test_pool().await else { return };
        let repo = ChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let (a, b) = tokio::join!(
            repo.start_or_get(user_id, "Ama"),
            repo.start_or_get(user_id, "Ama"),
        );

        let a = a.expect("first start failed");
        let b = b.expect("second start failed");
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    #[serial]
    async fn history_replays_in_append_order() {
        let Some(pool) = test_pool().await else { return };
        let repo = ChatRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let chat = repo.start_or_get(user_id, "Kofi").await.expect("start failed");
        let sender = user_id.to_string();

        for content in ["first", "second", "third"] {
            repo.append_message(chat.id, &sender, "Kofi", content)
                .await
                .expect("append failed");
        }

        let history = repo.history(chat.id).await.expect("history failed");
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));
    }
}
