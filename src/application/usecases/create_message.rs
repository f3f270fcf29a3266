use std::sync::Arc;

use crate::domain::{
    errors::DomainError,
    models::{Message, NewMessage},
    repositories::MessageRepository,
};

pub struct CreateMessageUseCase {
    repo: Arc<dyn MessageRepository>,
}

pub struct CreateMessageRequest {
    pub phone_number: String,
    pub content: String,
}

impl CreateMessageUseCase {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    /// Validates and stores a new `pending` message.
    pub async fn execute(&self, request: CreateMessageRequest) -> Result<Message, DomainError> {
        let message = NewMessage {
            phone_number: request.phone_number,
            content: request.content,
        };
        message.validate()?;

        let created = self
            .repo
            .insert(message)
            .await
            .map_err(|err| err.context("failed to create message"))?;

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::models::{MessageStatus, MessageValidationError},
        infrastructure::repositories::in_memory::InMemoryMessageRepository,
    };

    #[tokio::test]
    async fn created_message_is_fetched_as_pending() {
        let repo = Arc::new(InMemoryMessageRepository::new());
        let usecase = CreateMessageUseCase::new(repo.clone());

        let created = usecase
            .execute(CreateMessageRequest {
                phone_number: "+905551111111".to_string(),
                content: "hello".to_string(),
            })
            .await
            .unwrap();

        let pending = repo.fetch_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, created.id);
        assert_eq!(pending[0].status, MessageStatus::Pending);
        assert!(pending[0].sent_at.is_none());
        assert!(pending[0].delivery_id.is_none());
    }

    #[tokio::test]
    async fn invalid_message_is_rejected_before_storage() {
        let repo = Arc::new(InMemoryMessageRepository::new());
        let usecase = CreateMessageUseCase::new(repo.clone());

        let err = usecase
            .execute(CreateMessageRequest {
                phone_number: String::new(),
                content: "hello".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Validation(MessageValidationError::InvalidPhoneNumber)
        ));
        assert!(repo.fetch_pending(10).await.unwrap().is_empty());
    }
}
