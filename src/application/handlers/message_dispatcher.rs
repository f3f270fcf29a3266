use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    application::services::delivery::{DeliveryClient, DeliveryError},
    domain::{
        models::Message,
        repositories::{MessageRepository, SENT_MESSAGE_TTL, SentMessageCache},
    },
};

/// Counts for one batch cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub sent: usize,
    pub failed: usize,
    /// Messages left pending because the cycle was cancelled before they finished.
    pub skipped: usize,
}

/// One unit of periodic work, driven by the scheduler.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process_pending(
        &self,
        cancel: &CancellationToken,
        batch_size: usize,
    ) -> anyhow::Result<BatchReport>;
}

enum Outcome {
    Sent,
    Failed,
    Interrupted,
}

pub struct MessageDispatcher {
    repo: Arc<dyn MessageRepository>,
    delivery: Arc<dyn DeliveryClient>,
    cache: Option<Arc<dyn SentMessageCache>>,
}

impl MessageDispatcher {
    pub fn new(repo: Arc<dyn MessageRepository>, delivery: Arc<dyn DeliveryClient>) -> Self {
        Self {
            repo,
            delivery,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SentMessageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn dispatch(&self, cancel: &CancellationToken, mut message: Message) -> Outcome {
        if let Err(err) = message.validate() {
            warn!(message_id = %message.id, error = %err, "message validation failed");
            self.persist_failure(&mut message).await;
            return Outcome::Failed;
        }

        let receipt = match self
            .delivery
            .send(cancel, &message.phone_number, &message.content)
            .await
        {
            Ok(receipt) => receipt,
            Err(DeliveryError::Cancelled) => return Outcome::Interrupted,
            Err(err) => {
                warn!(message_id = %message.id, error = %err, "webhook request failed");
                self.persist_failure(&mut message).await;
                return Outcome::Failed;
            }
        };

        let sent_at = Utc::now();
        message.mark_sent(receipt.delivery_id.clone(), sent_at);

        if let Err(err) = self.repo.update_status(&message).await {
            // The endpoint already accepted it; leave the stored record as is.
            error!(
                message_id = %message.id,
                delivery_id = %receipt.delivery_id,
                error = %err,
                "failed to persist sent status"
            );
            return Outcome::Sent;
        }

        info!(
            message_id = %message.id,
            delivery_id = %receipt.delivery_id,
            phone_number = %message.phone_number,
            "message sent"
        );

        if let Some(cache) = &self.cache {
            match cache.put(&receipt.delivery_id, sent_at, SENT_MESSAGE_TTL).await {
                Ok(()) => info!(delivery_id = %receipt.delivery_id, "cached sent message"),
                Err(err) => warn!(
                    delivery_id = %receipt.delivery_id,
                    error = %err,
                    "failed to cache sent message"
                ),
            }
        }

        Outcome::Sent
    }

    async fn persist_failure(&self, message: &mut Message) {
        message.mark_failed();
        if let Err(err) = self.repo.update_status(message).await {
            error!(message_id = %message.id, error = %err, "failed to persist failed status");
        }
    }
}

#[async_trait]
impl BatchProcessor for MessageDispatcher {
    async fn process_pending(
        &self,
        cancel: &CancellationToken,
        batch_size: usize,
    ) -> anyhow::Result<BatchReport> {
        let messages = self
            .repo
            .fetch_pending(batch_size)
            .await
            .map_err(|err| err.context("failed to get pending messages"))?;

        let mut report = BatchReport {
            fetched: messages.len(),
            ..BatchReport::default()
        };

        if messages.is_empty() {
            info!("no pending messages to process");
            return Ok(report);
        }

        info!(count = messages.len(), "processing pending messages");

        for message in messages {
            if cancel.is_cancelled() {
                report.skipped += 1;
                continue;
            }
            match self.dispatch(cancel, message).await {
                Outcome::Sent => report.sent += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Interrupted => report.skipped += 1,
            }
        }

        if report.skipped > 0 {
            warn!(skipped = report.skipped, "batch interrupted; remaining messages stay pending");
        }

        Ok(report)
    }
}
