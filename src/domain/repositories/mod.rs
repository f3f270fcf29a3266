use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::models::{Message, NewMessage};

/// How long a delivery timestamp stays in the sent-message cache.
pub const SENT_MESSAGE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Pending messages, oldest `created_at` first, at most `limit` of them.
    async fn fetch_pending(&self, limit: usize) -> anyhow::Result<Vec<Message>>;

    /// Sent messages, most recent `sent_at` first.
    async fn fetch_sent(&self) -> anyhow::Result<Vec<Message>>;

    /// Persists `status`, `sent_at` and `delivery_id`. Fails with
    /// [`DomainError::NotFound`](crate::domain::errors::DomainError) for an unknown id.
    async fn update_status(&self, message: &Message) -> anyhow::Result<()>;

    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message>;
}

/// Best-effort record of when a delivery was confirmed, keyed by delivery id.
#[async_trait]
pub trait SentMessageCache: Send + Sync {
    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()>;

    async fn get(&self, delivery_id: &str) -> anyhow::Result<Option<DateTime<Utc>>>;
}
