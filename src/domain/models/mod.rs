pub mod message;

pub use message::{
    MAX_CONTENT_LENGTH, Message, MessageStatus, MessageValidationError, NewMessage,
    UnknownMessageStatus,
};
