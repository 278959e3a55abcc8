//! Ordered delivery of segmented text.

use crate::segmenter::{MessageSegmenter, SegmentLimits};
use derive_getters::Getters;
use std::sync::Arc;
use tickerbot_core::{ImageSource, MessageChunk, ParseMode};
use tickerbot_interface::Messenger;
use tracing::{error, info, instrument};

/// Where delivery stopped.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct DeliveryFailure {
    /// Zero-based index of the chunk that failed
    chunk_index: usize,
    /// Error description
    error: String,
}

/// Summary of one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct DeliveryReport {
    /// Chunks sent successfully
    sent: usize,
    /// Chunks in the delivery
    total: usize,
    /// Whether the image went out with the first chunk
    image_sent: bool,
    /// First failure, after which nothing else was attempted
    failure: Option<DeliveryFailure>,
}

impl DeliveryReport {
    /// Whether every chunk was delivered.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.sent == self.total
    }
}

/// Sends chunks to one chat, strictly in order.
///
/// The first chunk rides along with the image as its caption when an image
/// is given; every other chunk is a standalone message. A failed send is
/// logged and ends the delivery. Nothing is retried.
#[derive(Clone, Getters)]
pub struct DeliveryPipeline {
    #[getter(skip)]
    messenger: Arc<dyn Messenger>,
    /// Destination chat
    chat_id: String,
    /// Segmentation settings
    segmenter: MessageSegmenter,
}

impl std::fmt::Debug for DeliveryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryPipeline")
            .field("chat_id", &self.chat_id)
            .field("segmenter", &self.segmenter)
            .finish_non_exhaustive()
    }
}

impl DeliveryPipeline {
    /// Creates a pipeline.
    pub fn new(
        messenger: Arc<dyn Messenger>,
        chat_id: impl Into<String>,
        segmenter: MessageSegmenter,
    ) -> Self {
        Self {
            messenger,
            chat_id: chat_id.into(),
            segmenter,
        }
    }

    fn parse_mode(&self) -> ParseMode {
        *self.segmenter.parse_mode()
    }

    /// Segment `text` and deliver it.
    ///
    /// Without an image the first chunk is a plain message, so it is packed
    /// against the message limit instead of the caption limit.
    pub async fn deliver_text(&self, text: &str, image: Option<&ImageSource>) -> DeliveryReport {
        let limits: SegmentLimits = self.segmenter.limits().for_delivery(image.is_some());
        let chunks = self.segmenter.with_limits(limits).segment(text);
        self.deliver(&chunks, image).await
    }

    /// Deliver pre-segmented chunks.
    #[instrument(skip(self, chunks, image), fields(chat_id = %self.chat_id, total = chunks.len(), with_image = image.is_some()))]
    pub async fn deliver(
        &self,
        chunks: &[MessageChunk],
        image: Option<&ImageSource>,
    ) -> DeliveryReport {
        let total = chunks.len();
        let mode = self.parse_mode();
        let mut sent = 0;
        let mut image_sent = false;

        for (index, chunk) in chunks.iter().enumerate() {
            let result = match image {
                Some(image) if index == 0 => {
                    let result = self
                        .messenger
                        .send_image(&self.chat_id, image, chunk.text(), mode)
                        .await;
                    image_sent = result.is_ok();
                    result
                }
                _ => {
                    self.messenger
                        .send_message(&self.chat_id, chunk.text(), mode)
                        .await
                }
            };

            match result {
                Ok(receipt) => {
                    sent += 1;
                    tracing::debug!(
                        chunk = index,
                        message_id = receipt.message_id(),
                        role = %chunk.role(),
                        "Chunk delivered"
                    );
                }
                Err(e) => {
                    error!(
                        chunk = index,
                        sent,
                        total,
                        error = %e,
                        "Delivery failed, abandoning remaining chunks"
                    );
                    return DeliveryReport {
                        sent,
                        total,
                        image_sent,
                        failure: Some(DeliveryFailure {
                            chunk_index: index,
                            error: e.to_string(),
                        }),
                    };
                }
            }
        }

        info!(sent, total, image_sent, "Delivery complete");
        DeliveryReport {
            sent,
            total,
            image_sent,
            failure: None,
        }
    }
}
