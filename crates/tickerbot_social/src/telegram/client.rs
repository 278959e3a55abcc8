//! HTTP client for the Telegram Bot API.

use super::dto::{
    ApiResponse, GetUpdatesBody, SendMessageBody, SendPhotoUrlBody, TelegramMessage, Update,
};
use async_trait::async_trait;
use reqwest::{Client, multipart};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tickerbot_core::{ImageSource, ParseMode};
use tickerbot_error::{TelegramError, TelegramErrorKind, TelegramResult};
use tickerbot_interface::{Messenger, SentMessage};
use tickerbot_rate_limit::SendPacer;
use tracing::{debug, error, instrument, warn};

/// Public Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Hard Telegram limit on message text, in characters.
pub const TELEGRAM_MESSAGE_MAX_CHARS: usize = 4096;

/// Hard Telegram limit on photo captions, in characters.
pub const TELEGRAM_CAPTION_MAX_CHARS: usize = 1024;

/// Default bound on one outbound call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added to the long-poll timeout for the HTTP request itself.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Client for the Telegram Bot API.
///
/// Outbound sends share one [`SendPacer`] so a burst of chunks stays under
/// Telegram's flood limits. Each send is bounded by the send timeout.
/// `getUpdates` is not paced and uses the long-poll timeout instead.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    token: String,
    api_base: String,
    pacer: SendPacer,
    send_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("pacer", &self.pacer)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Creates a client against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is blank or the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> TelegramResult<Self> {
        Self::with_api_base(token, DEFAULT_TELEGRAM_API_BASE)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is blank or the HTTP client cannot be built.
    pub fn with_api_base(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> TelegramResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(TelegramError::new(TelegramErrorKind::MissingToken));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| TelegramError::new(TelegramErrorKind::Http(e.to_string())))?;

        Ok(Self {
            client,
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            pacer: SendPacer::unlimited(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    /// Pace outbound sends with `pacer`.
    pub fn with_pacer(mut self, pacer: SendPacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Bound each outbound send to `timeout`.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Decode a Bot API reply, mapping `ok = false` to an API error.
    async fn decode<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> TelegramResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelegramError::new(TelegramErrorKind::Http(e.without_url().to_string())))?;

        let reply: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            error!(method, status = %status, error = %e, "Failed to parse Bot API reply");
            TelegramError::new(TelegramErrorKind::ResponseParsing(format!(
                "HTTP {status}: {e}"
            )))
        })?;

        if !reply.ok {
            let description = reply
                .description
                .unwrap_or_else(|| format!("HTTP {status}"));
            warn!(method, error_code = ?reply.error_code, %description, "Bot API rejected call");
            return Err(TelegramError::new(TelegramErrorKind::Api {
                error_code: reply.error_code,
                description,
            }));
        }

        reply.result.ok_or_else(|| {
            TelegramError::new(TelegramErrorKind::ResponseParsing(
                "reply marked ok but carried no result".to_string(),
            ))
        })
    }

    async fn post_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> TelegramResult<T> {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            error!(method, error = %e, "HTTP request failed");
            TelegramError::new(TelegramErrorKind::Http(e.to_string()))
        })?;
        Self::decode(method, response).await
    }

    /// Fetch pending updates, waiting up to `timeout_secs` for new ones.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or an API rejection.
    #[instrument(skip(self))]
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> TelegramResult<Vec<Update>> {
        let body = GetUpdatesBody {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        let updates: Vec<Update> = self
            .post_json(
                "getUpdates",
                &body,
                Some(Duration::from_secs(timeout_secs) + POLL_GRACE),
            )
            .await?;
        debug!(count = updates.len(), "Received updates");
        Ok(updates)
    }

    async fn upload_photo(
        &self,
        chat_id: &str,
        data: Vec<u8>,
        file_name: String,
        caption: &str,
        parse_mode: ParseMode,
    ) -> TelegramResult<TelegramMessage> {
        let part = multipart::Part::bytes(data).file_name(file_name);
        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", part);
        if let Some(mode) = parse_mode.api_value() {
            form = form.text("parse_mode", mode);
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .timeout(self.send_timeout)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, "Photo upload failed");
                TelegramError::new(TelegramErrorKind::Http(e.to_string()))
            })?;
        Self::decode("sendPhoto", response).await
    }
}

fn check_length(text: &str, limit: usize) -> TelegramResult<()> {
    let length = text.chars().count();
    if length > limit {
        return Err(TelegramError::new(TelegramErrorKind::MessageTooLong {
            length,
            limit,
        }));
    }
    Ok(())
}

#[async_trait]
impl Messenger for TelegramClient {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> TelegramResult<SentMessage> {
        if chat_id.trim().is_empty() {
            return Err(TelegramError::new(TelegramErrorKind::MissingChatId));
        }
        check_length(text, TELEGRAM_MESSAGE_MAX_CHARS)?;

        self.pacer.acquire().await;
        let body = SendMessageBody {
            chat_id,
            text,
            parse_mode: parse_mode.api_value(),
        };
        let message: TelegramMessage = self
            .post_json("sendMessage", &body, Some(self.send_timeout))
            .await?;
        debug!(message_id = message.message_id(), "Message sent");
        Ok(SentMessage::new(*message.message_id()))
    }

    #[instrument(skip(self, image, caption), fields(caption_chars = caption.chars().count()))]
    async fn send_image(
        &self,
        chat_id: &str,
        image: &ImageSource,
        caption: &str,
        parse_mode: ParseMode,
    ) -> TelegramResult<SentMessage> {
        if chat_id.trim().is_empty() {
            return Err(TelegramError::new(TelegramErrorKind::MissingChatId));
        }
        check_length(caption, TELEGRAM_CAPTION_MAX_CHARS)?;

        let message: TelegramMessage = match image {
            ImageSource::Url(url) => {
                self.pacer.acquire().await;
                let body = SendPhotoUrlBody {
                    chat_id,
                    photo: url,
                    caption,
                    parse_mode: parse_mode.api_value(),
                };
                self.post_json("sendPhoto", &body, Some(self.send_timeout))
                    .await?
            }
            ImageSource::Path(path) => {
                let data = tokio::fs::read(path).await.map_err(|e| {
                    error!(path = %path.display(), error = %e, "Cannot read image");
                    TelegramError::new(TelegramErrorKind::ImageUnavailable(format!(
                        "{}: {e}",
                        path.display()
                    )))
                })?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "chart.png".to_string());
                self.pacer.acquire().await;
                self.upload_photo(chat_id, data, file_name, caption, parse_mode)
                    .await?
            }
            ImageSource::Bytes { data, file_name } => {
                self.pacer.acquire().await;
                self.upload_photo(chat_id, data.clone(), file_name.clone(), caption, parse_mode)
                    .await?
            }
        };

        debug!(message_id = message.message_id(), "Photo sent");
        Ok(SentMessage::new(*message.message_id()))
    }
}
