use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Message, MessageStatus, NewMessage},
    repositories::MessageRepository,
};

pub type PgPool = Pool<Postgres>;

const SAMPLE_MESSAGES: [(&str, &str); 5] = [
    ("+905551111111", "Test message 1 - Insider Project"),
    ("+905552222222", "Test message 2 - Welcome to Insider"),
    ("+905553333333", "Test message 3 - Your order is ready"),
    ("+905554444444", "Test message 4 - Thanks for shopping"),
    ("+905555555555", "Test message 5 - A special discount for you"),
];

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    /// Inserts a handful of pending messages when the table is empty.
    /// Returns how many rows were inserted.
    pub async fn seed_sample_messages(&self) -> anyhow::Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for (phone_number, content) in SAMPLE_MESSAGES {
            sqlx::query(
                r#"
                INSERT INTO messages (id, phone_number, content, status, created_at)
                VALUES ($1, $2, $3, 'pending', $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(phone_number)
            .bind(content)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(SAMPLE_MESSAGES.len())
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn fetch_pending(&self, limit: usize) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, phone_number, content, status, created_at, sent_at, delivery_id
            FROM messages
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn fetch_sent(&self) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, phone_number, content, status, created_at, sent_at, delivery_id
            FROM messages
            WHERE status = 'sent'
            ORDER BY sent_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn update_status(&self, message: &Message) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = $2,
                sent_at = $3,
                delivery_id = $4
            WHERE id = $1
            "#,
        )
        .bind(message.id)
        .bind(message.status.as_str())
        .bind(message.sent_at)
        .bind(&message.delivery_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("message {}", message.id)).into());
        }
        Ok(())
    }

    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, phone_number, content, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, phone_number, content, status, created_at, sent_at, delivery_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&message.phone_number)
        .bind(&message.content)
        .bind(MessageStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Message::try_from(record)
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    phone_number: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    delivery_id: Option<String>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = anyhow::Error;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let status = value.status.parse::<MessageStatus>()?;
        Ok(Self {
            id: value.id,
            phone_number: value.phone_number,
            content: value.content,
            status,
            created_at: value.created_at,
            sent_at: value.sent_at,
            delivery_id: value.delivery_id,
        })
    }
}
