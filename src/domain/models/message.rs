use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted message body, counted in characters.
pub const MAX_CONTENT_LENGTH: usize = 160;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message status {0}")]
pub struct UnknownMessageStatus(pub String);

impl FromStr for MessageStatus {
    type Err = UnknownMessageStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(MessageStatus::Pending),
            "sent" => Ok(MessageStatus::Sent),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(UnknownMessageStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageValidationError {
    #[error("message content cannot be empty")]
    EmptyContent,
    #[error("message content exceeds maximum length of {MAX_CONTENT_LENGTH} characters")]
    ContentTooLong,
    #[error("invalid phone number")]
    InvalidPhoneNumber,
}

/// A message queued for delivery.
///
/// `sent_at` and `delivery_id` are only ever populated together, by [`Message::mark_sent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub phone_number: String,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_id: Option<String>,
}

/// Input for a message that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub phone_number: String,
    pub content: String,
}

impl NewMessage {
    pub fn validate(&self) -> Result<(), MessageValidationError> {
        validate_fields(&self.phone_number, &self.content)
    }
}

impl Message {
    pub fn validate(&self) -> Result<(), MessageValidationError> {
        validate_fields(&self.phone_number, &self.content)
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }

    pub fn mark_sent(&mut self, delivery_id: String, sent_at: DateTime<Utc>) {
        self.status = MessageStatus::Sent;
        self.sent_at = Some(sent_at);
        self.delivery_id = Some(delivery_id);
    }

    pub fn mark_failed(&mut self) {
        self.status = MessageStatus::Failed;
    }
}

fn validate_fields(phone_number: &str, content: &str) -> Result<(), MessageValidationError> {
    if content.is_empty() {
        return Err(MessageValidationError::EmptyContent);
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(MessageValidationError::ContentTooLong);
    }
    if phone_number.is_empty() {
        return Err(MessageValidationError::InvalidPhoneNumber);
    }
    Ok(())
}
