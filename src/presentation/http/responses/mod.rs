use chrono::{DateTime, Utc};
use poem_openapi::{ApiResponse, Object, payload::Json};
use uuid::Uuid;

use crate::presentation::models::{MessageStatusDto, SchedulerStateDto};

#[derive(Object)]
pub struct ActionResponseDto {
    pub success: bool,
    pub message: String,
}

impl ActionResponseDto {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Object)]
pub struct SchedulerStatusDto {
    pub status: SchedulerStateDto,
    pub running: bool,
}

#[derive(Object)]
pub struct SchedulerStatusResponseDto {
    pub success: bool,
    pub message: String,
    pub data: SchedulerStatusDto,
}

#[derive(Object)]
pub struct MessageDto {
    pub id: Uuid,
    pub phone_number: String,
    pub content: String,
    pub status: MessageStatusDto,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_id: Option<String>,
}

#[derive(Object)]
pub struct CreatedMessageDto {
    pub id: Uuid,
}

#[derive(Object)]
pub struct CreateMessageResponseDto {
    pub success: bool,
    pub message: String,
    pub data: CreatedMessageDto,
}

#[derive(Object)]
pub struct SentMessagesDto {
    pub messages: Vec<MessageDto>,
    pub count: usize,
}

#[derive(Object)]
pub struct SentMessagesResponseDto {
    pub success: bool,
    pub message: String,
    pub data: SentMessagesDto,
}

#[derive(Object)]
pub struct CachedSentAtDto {
    pub delivery_id: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(ApiResponse)]
pub enum CreateMessageResponse {
    #[oai(status = 201)]
    Created(Json<CreateMessageResponseDto>),
    #[oai(status = 400)]
    BadRequest(Json<ActionResponseDto>),
}

#[derive(ApiResponse)]
pub enum CachedSentAtResponse {
    #[oai(status = 200)]
    Ok(Json<CachedSentAtDto>),
    #[oai(status = 404)]
    NotFound(Json<ActionResponseDto>),
}
