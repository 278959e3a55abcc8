//! Transport-sized message chunks.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Role a chunk plays in delivery.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum ChunkRole {
    /// Attached to an image; subject to the caption limit.
    Caption,
    /// Standalone message; subject to the message limit.
    Message,
}

/// One ordered, size-bounded piece of an outgoing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MessageChunk {
    /// Escaped text, ready to send
    text: String,
    /// Whether this is the first chunk of its sequence
    is_first: bool,
    /// Delivery role
    role: ChunkRole,
}

impl MessageChunk {
    /// Creates a chunk. The first chunk of a sequence is always a caption.
    pub fn new(text: impl Into<String>, is_first: bool) -> Self {
        Self {
            text: text.into(),
            is_first,
            role: if is_first {
                ChunkRole::Caption
            } else {
                ChunkRole::Message
            },
        }
    }

    /// Length in characters, the unit transport limits are expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Consumes the chunk, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }
}
