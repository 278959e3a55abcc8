//! Telegram delivery for the tickerbot report pipeline.
//!
//! Generated text goes through two stages on its way out:
//! - [`MessageSegmenter`] escapes it for the chat's formatting syntax and
//!   splits it into size-bounded chunks
//! - [`DeliveryPipeline`] sends those chunks in order, the first one as an
//!   image caption when a chart is attached
//!
//! [`TelegramClient`] is the Bot API transport behind both.

#![warn(missing_docs)]

mod delivery;
mod segmenter;
mod telegram;

pub use delivery::{DeliveryFailure, DeliveryPipeline, DeliveryReport};
pub use segmenter::{
    DEFAULT_CAPTION_LIMIT, DEFAULT_MESSAGE_LIMIT, ESCAPE_MARKER, MARKDOWN_RESERVED,
    MARKDOWN_V2_RESERVED, MIN_LIMIT, MessageSegmenter, SegmentLimits, escape, segment, unescape,
};
pub use telegram::{
    ApiResponse, Chat, DEFAULT_SEND_TIMEOUT, DEFAULT_TELEGRAM_API_BASE, TELEGRAM_CAPTION_MAX_CHARS,
    TELEGRAM_MESSAGE_MAX_CHARS, TelegramClient, TelegramMessage, Update, User,
};
