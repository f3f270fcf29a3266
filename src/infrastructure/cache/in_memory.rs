use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::repositories::SentMessageCache;

#[derive(Default, Clone)]
pub struct InMemorySentMessageCache {
    entries: Arc<RwLock<HashMap<String, (DateTime<Utc>, Instant)>>>,
}

impl InMemorySentMessageCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SentMessageCache for InMemorySentMessageCache {
    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(delivery_id.to_string(), (sent_at, Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, delivery_id: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(delivery_id)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(sent_at, _)| *sent_at))
    }
}
