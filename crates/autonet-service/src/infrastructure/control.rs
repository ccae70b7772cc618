//! Line-based control console for the coordinator binary.
//!
//! The messaging service that actually learns when a device joined runs out
//! of process, so the binary accepts its notifications (and an operator's)
//! as text commands, one per line, on standard input:
//!
//! | Command              | Effect                                          |
//! |----------------------|-------------------------------------------------|
//! | `complete <id>`      | [`Coordinator::networking_complete`]            |
//! | `disconnect <id>`    | [`Coordinator::disconnect`]                     |
//! | `cancel <id>`        | [`Coordinator::cancel_handshake`]               |
//! | `list`               | [`Coordinator::get_devices`]                    |
//! | `status <id>`        | connecting / connected / unknown                |
//! | `quit`               | stops the console and the coordinator           |
//!
//! Blank lines and lines starting with `#` are ignored.  Every command is
//! answered with one reply line written to the supplied writer.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::application::registry::DeviceState;
use crate::infrastructure::network::coordinator::Coordinator;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Complete(String),
    Disconnect(String),
    Cancel(String),
    List,
    Status(String),
    Quit,
}

/// Reasons a console line is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs a device id")]
    MissingDeviceId(&'static str),
    #[error("'{0}' takes no arguments")]
    UnexpectedArgument(&'static str),
}

impl FromStr for ControlCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;
        let arg = words.next();
        let extra = words.next().is_some();

        let with_id = |name: &'static str| match (arg, extra) {
            (Some(id), false) => Ok(id.to_string()),
            (None, _) => Err(CommandError::MissingDeviceId(name)),
            (Some(_), true) => Err(CommandError::UnexpectedArgument(name)),
        };
        let bare = |name: &'static str, cmd: ControlCommand| match arg {
            None => Ok(cmd),
            Some(_) => Err(CommandError::UnexpectedArgument(name)),
        };

        match verb.to_ascii_lowercase().as_str() {
            "complete" => with_id("complete").map(ControlCommand::Complete),
            "disconnect" => with_id("disconnect").map(ControlCommand::Disconnect),
            "cancel" => with_id("cancel").map(ControlCommand::Cancel),
            "status" => with_id("status").map(ControlCommand::Status),
            "list" => bare("list", ControlCommand::List),
            "quit" | "exit" => bare("quit", ControlCommand::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Applies `command` to `coordinator` and returns the reply line.
pub fn execute(coordinator: &Coordinator, command: &ControlCommand) -> String {
    match command {
        ControlCommand::Complete(id) => {
            if coordinator.networking_complete(id) {
                format!("ok: {id} connected")
            } else {
                format!("ignored: {id} is not connecting")
            }
        }
        ControlCommand::Disconnect(id) => {
            if coordinator.disconnect(id) {
                format!("ok: {id} disconnected")
            } else {
                format!("ignored: {id} is not connected")
            }
        }
        ControlCommand::Cancel(id) => {
            if coordinator.cancel_handshake(id) {
                format!("ok: handshake for {id} cancelled")
            } else {
                format!("ignored: {id} is not connecting")
            }
        }
        ControlCommand::List => {
            let devices = coordinator.get_devices();
            if devices.is_empty() {
                return "no connected devices".to_string();
            }
            devices
                .iter()
                .map(|(id, info)| format!("{id}: {info}"))
                .collect::<Vec<_>>()
                .join(", ")
        }
        ControlCommand::Status(id) => match coordinator.registry().state(id) {
            DeviceState::Connecting => format!("{id}: connecting"),
            DeviceState::Connected => format!("{id}: connected"),
            DeviceState::Unknown => format!("{id}: unknown"),
        },
        ControlCommand::Quit => {
            coordinator.shutdown();
            "bye".to_string()
        }
    }
}

/// Reads commands from `input` until EOF or `quit`, writing one reply per
/// command to `output`.
///
/// # Errors
///
/// Propagates I/O errors from either stream.
pub async fn run_console<R, W>(
    coordinator: Arc<Coordinator>,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let reply = match line.parse::<ControlCommand>() {
            Ok(command) => {
                debug!("control command: {command:?}");
                let reply = execute(&coordinator, &command);
                if command == ControlCommand::Quit {
                    output.write_all(format!("{reply}\n").as_bytes()).await?;
                    output.flush().await?;
                    return Ok(());
                }
                reply
            }
            Err(e) => {
                warn!("rejected control line '{line}': {e}");
                format!("error: {e}")
            }
        };
        output.write_all(format!("{reply}\n").as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
