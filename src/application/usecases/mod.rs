pub mod create_message;
pub mod get_cached_sent_at;
pub mod list_sent_messages;
