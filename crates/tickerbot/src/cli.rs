//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// File name looked up in the user config directory and the working directory.
const CONFIG_FILE_NAME: &str = "tickerbot.toml";

/// Daily AI market report delivered to Telegram.
#[derive(Parser, Debug)]
#[command(name = "tickerbot")]
#[command(about = "Daily AI market report delivered to Telegram")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "TICKERBOT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// What to do; defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the daily scheduler and the chat command listener until Ctrl+C
    Run,
    /// Generate and deliver one report now, then exit
    Once,
    /// Load and validate the configuration, print a summary, then exit
    CheckConfig,
}

impl Cli {
    /// Selected subcommand.
    pub fn selected_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Configuration file to load, if any.
    ///
    /// An explicit path wins. Otherwise the user config directory
    /// (`tickerbot/config.toml`) and then `./tickerbot.toml` are tried; when
    /// neither exists the configuration comes from the environment alone.
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        let user = dirs::config_dir().map(|dir| dir.join("tickerbot").join("config.toml"));
        user.into_iter()
            .chain(std::iter::once(PathBuf::from(CONFIG_FILE_NAME)))
            .find(|candidate| candidate.exists())
    }
}
