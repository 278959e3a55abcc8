//! Inbound chat commands.

use crate::REPORT_TASK_NAME;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tickerbot_core::ParseMode;
use tickerbot_error::TelegramResult;
use tickerbot_interface::{Messenger, TaskOutcome};
use tickerbot_server::Scheduler;
use tickerbot_social::{TelegramClient, Update};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

/// Pause after a failed poll before trying again.
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

/// Reply to `/help`.
pub const HELP_TEXT: &str = "\
/report - generate and send the market report now
/start - same as /report
/help - show this message";

/// Reply sent when an on-demand report starts.
pub const REPORT_STARTED_TEXT: &str = "Generating the market report, this can take a few minutes.";

/// Reply sent when an on-demand report finds another run in flight.
pub const REPORT_BUSY_TEXT: &str = "A report is already in progress.";

/// Commands the bot understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Same as `/report`
    Start,
    /// Run the report now
    Report,
    /// List commands
    Help,
    /// Anything else starting with a slash
    Unknown(String),
}

impl Command {
    /// Parse the command at the start of a message.
    ///
    /// Returns `None` for text that is not a command. A `@botname` suffix is
    /// ignored and matching is case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerbot_bot::Command;
    ///
    /// assert_eq!(Command::parse("/report"), Some(Command::Report));
    /// assert_eq!(Command::parse("/Help@TickerBot extra"), Some(Command::Help));
    /// assert_eq!(Command::parse("hello"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = token.split('@').next().unwrap_or_default().to_lowercase();
        Some(match name.as_str() {
            "start" => Command::Start,
            "report" => Command::Report,
            "help" => Command::Help,
            _ => Command::Unknown(name),
        })
    }
}

/// Long-polls for commands and triggers the report on demand.
///
/// On-demand runs are tracked so shutdown can wait for them.
#[derive(Debug, Clone)]
pub struct CommandListener {
    client: Arc<TelegramClient>,
    scheduler: Arc<Scheduler>,
    allowed_chat_ids: Vec<i64>,
    poll_timeout_secs: u64,
    reports: Arc<Mutex<JoinSet<()>>>,
}

impl CommandListener {
    /// Creates a listener. An empty `allowed_chat_ids` accepts every chat.
    pub fn new(
        client: Arc<TelegramClient>,
        scheduler: Arc<Scheduler>,
        allowed_chat_ids: Vec<i64>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            scheduler,
            allowed_chat_ids,
            poll_timeout_secs,
            reports: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// On-demand report runs that have not been awaited yet.
    pub fn reports_in_flight(&self) -> usize {
        let mut reports = self.reports.lock();
        while reports.try_join_next().is_some() {}
        reports.len()
    }

    /// Wait for every on-demand report run started so far.
    pub async fn wait_for_reports(&self) {
        let mut reports = std::mem::take(&mut *self.reports.lock());
        if !reports.is_empty() {
            info!(count = reports.len(), "Waiting for on-demand reports");
        }
        while let Some(result) = reports.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "On-demand report task ended abnormally");
            }
        }
    }

    fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.is_empty() || self.allowed_chat_ids.contains(&chat_id)
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        reply(&self.client, chat_id, text).await;
    }

    /// Act on one update.
    ///
    /// Returns a handle to the report run when the update started one.
    #[instrument(skip(self, update), fields(update_id = update.update_id()))]
    pub async fn handle_update(&self, update: &Update) -> Option<AbortHandle> {
        let (chat_id, text) = update.text_message()?;
        let command = Command::parse(text)?;

        if !self.is_allowed(chat_id) {
            debug!(chat_id, ?command, "Ignoring command from unlisted chat");
            return None;
        }
        info!(chat_id, ?command, "Received command");

        match command {
            Command::Help => {
                self.reply(chat_id, HELP_TEXT).await;
                None
            }
            Command::Unknown(name) => {
                self.reply(chat_id, &format!("Unknown command /{name}.\n\n{HELP_TEXT}"))
                    .await;
                None
            }
            Command::Start | Command::Report => {
                self.reply(chat_id, REPORT_STARTED_TEXT).await;
                Some(self.spawn_report(chat_id))
            }
        }
    }

    fn spawn_report(&self, chat_id: i64) -> AbortHandle {
        let client = self.client.clone();
        let scheduler = self.scheduler.clone();
        let mut reports = self.reports.lock();
        while reports.try_join_next().is_some() {}
        reports.spawn(async move {
            match scheduler.trigger(REPORT_TASK_NAME).await {
                Some(Ok(TaskOutcome::Completed)) => {
                    info!(chat_id, "On-demand report completed");
                }
                Some(Ok(TaskOutcome::Skipped(reason))) => {
                    reply(&client, chat_id, REPORT_BUSY_TEXT).await;
                    debug!(chat_id, %reason, "On-demand report skipped");
                }
                Some(Err(e)) => {
                    error!(chat_id, error = %e, "On-demand report failed");
                    reply(
                        &client,
                        chat_id,
                        "The report could not be generated, see the logs.",
                    )
                    .await;
                }
                None => {
                    error!("Report task is not registered");
                }
            }
        })
    }

    /// Fetch one batch of updates and handle them.
    ///
    /// Returns the offset to poll from next.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll itself fails.
    pub async fn poll_once(&self, offset: Option<i64>) -> TelegramResult<Option<i64>> {
        let updates = self.client.get_updates(offset, self.poll_timeout_secs).await?;
        let mut next = offset;
        for update in &updates {
            next = Some(update.update_id() + 1);
            // Report runs continue in the background.
            self.handle_update(update).await;
        }
        Ok(next)
    }

    /// Poll until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_timeout_secs = self.poll_timeout_secs,
            allowed_chats = self.allowed_chat_ids.len(),
            "Command listener started"
        );
        let mut offset = None;

        loop {
            let result = tokio::select! {
                result = self.poll_once(offset) => result,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            match result {
                Ok(next) => offset = next,
                Err(e) => {
                    warn!(error = %e, "Polling for commands failed");
                    tokio::select! {
                        _ = tokio::time::sleep(POLL_ERROR_DELAY) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            }
        }
        info!("Shutdown signal received, stopping command listener");
        self.wait_for_reports().await;
    }
}

async fn reply(client: &TelegramClient, chat_id: i64, text: &str) {
    if let Err(e) = client
        .send_message(&chat_id.to_string(), text, ParseMode::Plain)
        .await
    {
        warn!(chat_id, error = %e, "Failed to reply to command");
    }
}
