use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Confirmation returned by the delivery endpoint for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub delivery_id: String,
}

/// Why a single outbound attempt did not produce a receipt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("failed to send request: {0}")]
    Transport(String),
    #[error("unexpected status code: {status}, body: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery cancelled")]
    Cancelled,
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Delivers one message. Returns [`DeliveryError::Cancelled`] as soon as `cancel` fires,
    /// even in the middle of an attempt or a backoff wait.
    async fn send(
        &self,
        cancel: &CancellationToken,
        phone_number: &str,
        content: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}
