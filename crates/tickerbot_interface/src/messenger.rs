//! Outbound chat transport trait.

use async_trait::async_trait;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tickerbot_core::{ImageSource, ParseMode};
use tickerbot_error::TelegramResult;

/// Receipt for a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct SentMessage {
    /// Transport-assigned message identifier
    message_id: i64,
}

impl SentMessage {
    /// Creates a receipt.
    pub fn new(message_id: i64) -> Self {
        Self { message_id }
    }
}

/// Chat transport capable of sending text and captioned images.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message.
    ///
    /// # Errors
    ///
    /// Returns error if the transport rejects or fails to deliver the message.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> TelegramResult<SentMessage>;

    /// Send an image with a caption.
    ///
    /// # Errors
    ///
    /// Returns error if the image cannot be read or the transport rejects it.
    async fn send_image(
        &self,
        chat_id: &str,
        image: &ImageSource,
        caption: &str,
        parse_mode: ParseMode,
    ) -> TelegramResult<SentMessage>;
}
