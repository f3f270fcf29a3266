use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::{
    scheduler::Scheduler,
    usecases::{
        create_message::CreateMessageUseCase, get_cached_sent_at::GetCachedSentAtUseCase,
        list_sent_messages::ListSentMessagesUseCase,
    },
};

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
    pub create_message_usecase: Arc<CreateMessageUseCase>,
    pub list_sent_messages_usecase: Arc<ListSentMessagesUseCase>,
    pub get_cached_sent_at_usecase: Arc<GetCachedSentAtUseCase>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Scheduler,
    Messages,
}

pub(crate) fn internal_error(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(
        format!("{err:#}"),
        poem::http::StatusCode::INTERNAL_SERVER_ERROR,
    )
}
