use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Path, payload::Json};

use crate::{
    application::usecases::create_message::CreateMessageRequest,
    domain::errors::DomainError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags, internal_error},
        mappers::map_message,
        requests::CreateMessageRequestDto,
        responses::{
            ActionResponseDto, CachedSentAtDto, CachedSentAtResponse, CreateMessageResponse,
            CreateMessageResponseDto, CreatedMessageDto, SentMessagesDto, SentMessagesResponseDto,
        },
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    /// Queue a message for the next dispatch cycle.
    #[oai(
        path = "/messages",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn create_message(
        &self,
        request: Json<CreateMessageRequestDto>,
    ) -> PoemResult<CreateMessageResponse> {
        let payload = CreateMessageRequest {
            phone_number: request.phone_number.clone(),
            content: request.content.clone(),
        };

        match self.state.create_message_usecase.execute(payload).await {
            Ok(message) => Ok(CreateMessageResponse::Created(Json(
                CreateMessageResponseDto {
                    success: true,
                    message: "created".to_string(),
                    data: CreatedMessageDto { id: message.id },
                },
            ))),
            Err(DomainError::Validation(err)) => Ok(CreateMessageResponse::BadRequest(Json(
                ActionResponseDto::error(err.to_string()),
            ))),
            Err(DomainError::NotFound(what)) => Err(internal_error(anyhow::anyhow!(
                "{what} not found"
            ))),
            Err(DomainError::Other(err)) => Err(internal_error(err)),
        }
    }

    /// Messages already delivered, most recently sent first.
    #[oai(
        path = "/messages/sent",
        method = "get",
        tag = EndpointsTags::Messages,
    )]
    pub async fn list_sent_messages(&self) -> PoemResult<Json<SentMessagesResponseDto>> {
        let messages = self
            .state
            .list_sent_messages_usecase
            .execute()
            .await
            .map_err(internal_error)?;

        let messages: Vec<_> = messages.iter().map(map_message).collect();
        let count = messages.len();

        Ok(Json(SentMessagesResponseDto {
            success: true,
            message: "sent messages".to_string(),
            data: SentMessagesDto { messages, count },
        }))
    }

    #[oai(
        path = "/messages/sent/:delivery_id/cache",
        method = "get",
        tag = EndpointsTags::Messages,
    )]
    pub async fn get_cached_sent_at(
        &self,
        delivery_id: Path<String>,
    ) -> PoemResult<CachedSentAtResponse> {
        let cached = self
            .state
            .get_cached_sent_at_usecase
            .execute(&delivery_id.0)
            .await
            .map_err(internal_error)?;

        Ok(match cached {
            Some(sent_at) => CachedSentAtResponse::Ok(Json(CachedSentAtDto {
                delivery_id: delivery_id.0,
                sent_at,
            })),
            None => CachedSentAtResponse::NotFound(Json(ActionResponseDto::error(
                "no cached record for delivery id",
            ))),
        })
    }
}
