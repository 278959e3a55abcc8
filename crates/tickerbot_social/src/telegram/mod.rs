//! Telegram Bot API transport.

mod client;
mod dto;

pub use client::{
    DEFAULT_SEND_TIMEOUT, DEFAULT_TELEGRAM_API_BASE, TELEGRAM_CAPTION_MAX_CHARS, TELEGRAM_MESSAGE_MAX_CHARS,
    TelegramClient,
};
pub use dto::{ApiResponse, Chat, TelegramMessage, Update, User};
