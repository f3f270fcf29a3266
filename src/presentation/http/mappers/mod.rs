use crate::{domain::models::Message, presentation::http::responses::MessageDto};

pub fn map_message(message: &Message) -> MessageDto {
    MessageDto {
        id: message.id,
        phone_number: message.phone_number.clone(),
        content: message.content.clone(),
        status: message.status.into(),
        created_at: message.created_at,
        sent_at: message.sent_at,
        delivery_id: message.delivery_id.clone(),
    }
}
