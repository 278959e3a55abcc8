//! Bot API request and reply shapes.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Envelope every Bot API reply is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded
    pub ok: bool,
    /// Payload on success
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    /// Human readable error on failure
    #[serde(default)]
    pub description: Option<String>,
    /// Error code on failure
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// Chat a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Chat {
    /// Chat identifier
    id: i64,
    /// Chat type, e.g. "private" or "group"
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Sender of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct User {
    /// User identifier
    id: i64,
    /// Whether the sender is a bot
    #[serde(default)]
    is_bot: bool,
    /// Username without the leading @
    #[serde(default)]
    username: Option<String>,
}

/// Message as returned by the Bot API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TelegramMessage {
    /// Message identifier within the chat
    message_id: i64,
    /// Chat the message was sent in
    chat: Chat,
    /// Sender, absent for channel posts
    #[serde(default)]
    from: Option<User>,
    /// Text body
    #[serde(default)]
    text: Option<String>,
    /// Unix timestamp
    #[serde(default)]
    date: Option<i64>,
}

/// One inbound update from `getUpdates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Update {
    /// Monotonic update identifier
    update_id: i64,
    /// New incoming message, if this update carries one
    #[serde(default)]
    message: Option<TelegramMessage>,
}

impl Update {
    /// Chat id and text of a text message update.
    pub fn text_message(&self) -> Option<(i64, &str)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?;
        Some((message.chat.id, text))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageBody<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendPhotoUrlBody<'a> {
    pub chat_id: &'a str,
    pub photo: &'a str,
    pub caption: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GetUpdatesBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}
