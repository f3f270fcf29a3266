use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Message, MessageStatus, NewMessage},
    repositories::MessageRepository,
};

#[derive(Default, Clone)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &Uuid) -> Option<Message> {
        let messages = self.messages.read().await;
        messages.get(id).cloned()
    }

    /// Replaces a stored record wholesale, bypassing status rules.
    pub async fn overwrite(&self, message: Message) {
        let mut messages = self.messages.write().await;
        messages.insert(message.id, message);
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn fetch_pending(&self, limit: usize) -> anyhow::Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut pending: Vec<Message> = messages
            .values()
            .filter(|m| m.status == MessageStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn fetch_sent(&self) -> anyhow::Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut sent: Vec<Message> = messages
            .values()
            .filter(|m| m.status == MessageStatus::Sent)
            .cloned()
            .collect();
        sent.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(sent)
    }

    async fn update_status(&self, message: &Message) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        let entry = messages
            .get_mut(&message.id)
            .ok_or_else(|| DomainError::NotFound(format!("message {}", message.id)))?;
        entry.status = message.status;
        entry.sent_at = message.sent_at;
        entry.delivery_id = message.delivery_id.clone();
        Ok(())
    }

    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message> {
        let entry = Message {
            id: Uuid::new_v4(),
            phone_number: message.phone_number,
            content: message.content,
            status: MessageStatus::Pending,
            created_at: Utc::now(),
            sent_at: None,
            delivery_id: None,
        };
        let mut messages = self.messages.write().await;
        messages.insert(entry.id, entry.clone());
        Ok(entry)
    }
}
