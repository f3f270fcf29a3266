use std::sync::Arc;

use crate::domain::{models::Message, repositories::MessageRepository};

pub struct ListSentMessagesUseCase {
    repo: Arc<dyn MessageRepository>,
}

impl ListSentMessagesUseCase {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> anyhow::Result<Vec<Message>> {
        self.repo
            .fetch_sent()
            .await
            .map_err(|err| err.context("failed to get sent messages"))
    }
}
