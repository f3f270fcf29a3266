use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::repositories::SentMessageCache;

/// Looks up the cached delivery time for a delivery confirmation id.
pub struct GetCachedSentAtUseCase {
    cache: Arc<dyn SentMessageCache>,
}

impl GetCachedSentAtUseCase {
    pub fn new(cache: Arc<dyn SentMessageCache>) -> Self {
        Self { cache }
    }

    pub async fn execute(&self, delivery_id: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        self.cache.get(delivery_id).await
    }
}
