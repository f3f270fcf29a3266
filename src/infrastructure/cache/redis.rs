use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;

use crate::domain::repositories::SentMessageCache;

const KEY_PREFIX: &str = "sent_message";

#[derive(Clone)]
pub struct RedisSentMessageCache {
    conn: ConnectionManager,
}

impl RedisSentMessageCache {
    /// Connects and pings the server so an unreachable Redis fails at startup.
    pub async fn connect(url: &str) -> anyhow::Result<Arc<Self>> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let mut conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .context("failed to ping redis")?;
        Ok(Arc::new(Self { conn }))
    }

    fn key(delivery_id: &str) -> String {
        format!("{KEY_PREFIX}:{delivery_id}")
    }
}

#[async_trait]
impl SentMessageCache for RedisSentMessageCache {
    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(delivery_id))
            .arg(sent_at.to_rfc3339())
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .context("failed to cache sent message")
    }

    async fn get(&self, delivery_id: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(Self::key(delivery_id))
            .query_async(&mut conn)
            .await
            .context("failed to get cached message")?;

        value
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .context("failed to parse sent time")
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_delivery_id() {
        assert_eq!(
            RedisSentMessageCache::key("67f2f8a8-ea58"),
            "sent_message:67f2f8a8-ea58"
        );
    }
}
