//! Chat commands: `<prefix>start <url>` and `<prefix>stop`.

use crate::channels::traits::MessageTone;
use crate::error::WatchError;
use crate::watch::{SubscriberId, WatchManager};
use tracing::warn;

/// A recognised command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start watching a URL. `url` is `None` when the user gave no argument.
    Start { url: Option<String> },
    Stop,
}

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub tone: MessageTone,
}

impl CommandReply {
    fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: MessageTone::Success,
        }
    }

    fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: MessageTone::Failure,
        }
    }
}

/// Parse `text` as a command. Anything that is not a known command after
/// `prefix` yields `None`.
pub fn parse_command(text: &str, prefix: &str) -> Option<Command> {
    let rest = text.trim().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    match words.next()? {
        "start" => Some(Command::Start {
            url: words.next().map(str::to_owned),
        }),
        "stop" => Some(Command::Stop),
        _ => None,
    }
}

/// Run `command` on behalf of `sender`.
pub async fn handle_command(
    manager: &WatchManager,
    sender: &SubscriberId,
    command: Command,
) -> CommandReply {
    match command {
        Command::Start { url: None } => {
            if manager.watched_url(sender).await.is_some() {
                CommandReply::failure("A watch is already running.")
            } else {
                CommandReply::failure("No URL given.")
            }
        }
        Command::Start { url: Some(url) } => match manager.start(sender.clone(), &url).await {
            Ok(()) => CommandReply::success("Watch started."),
            Err(e) => reply_for_error(sender, e),
        },
        Command::Stop => match manager.stop(sender).await {
            Ok(()) => CommandReply::success("Watch stopped."),
            Err(e) => reply_for_error(sender, e),
        },
    }
}

fn reply_for_error(sender: &SubscriberId, err: WatchError) -> CommandReply {
    match err {
        WatchError::AlreadyWatching(_) => CommandReply::failure("A watch is already running."),
        WatchError::NotWatching(_) => CommandReply::failure("No watch is running."),
        WatchError::InvalidInput(reason) => CommandReply::failure(format!("Invalid URL: {reason}")),
        WatchError::Persistence(reason) => {
            warn!(subscriber = %sender, "watch state not saved: {reason}");
            CommandReply::failure(format!("Could not save watch state: {reason}"))
        }
        other => {
            warn!(subscriber = %sender, "command failed: {other}");
            CommandReply::failure(format!("Command failed: {other}"))
        }
    }
}
