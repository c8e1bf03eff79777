//! Console chat host.
//!
//! A minimal host for running the bridge from a terminal: typed lines become
//! chat messages, system messages are printed, and slash commands drive the
//! settings panel.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::bridge::AdapterHandle;
use crate::common::HostMessage;
use crate::host::{EventSource, HostContext};

/// Speaker name for lines typed by the local user.
const LOCAL_USER: &str = "You";

/// Prints posted system messages to stdout.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl HostContext for ConsoleHost {
    fn send_system_message(&self, text: &str) {
        println!("[system] {}", text);
    }
}

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// A chat message to emit on the host event source.
    Message(HostMessage),
    SetToken(String),
    SetChannel(String),
    Connect,
    ShowSettings,
    Status,
    Quit,
    Help,
    /// Nothing to do (blank line).
    Empty,
    Unknown(String),
}

/// Parse one console line.
pub fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return ConsoleInput::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ConsoleInput::Message(HostMessage {
            name: LOCAL_USER.to_string(),
            mes: line.to_string(),
            is_system: false,
            is_user: true,
        });
    };

    let (name, args) = match command.split_once(' ') {
        Some((name, args)) => (name, args.trim()),
        None => (command, ""),
    };

    match name.to_lowercase().as_str() {
        "as" => match args.split_once(':') {
            Some((speaker, text)) if !speaker.trim().is_empty() => {
                ConsoleInput::Message(HostMessage {
                    name: speaker.trim().to_string(),
                    mes: text.trim_start().to_string(),
                    is_system: false,
                    is_user: false,
                })
            }
            _ => ConsoleInput::Unknown(line.to_string()),
        },
        "system" => ConsoleInput::Message(HostMessage {
            name: "System".to_string(),
            mes: args.to_string(),
            is_system: true,
            is_user: false,
        }),
        "token" => ConsoleInput::SetToken(args.to_string()),
        "channel" => ConsoleInput::SetChannel(args.to_string()),
        "connect" => ConsoleInput::Connect,
        "settings" => ConsoleInput::ShowSettings,
        "status" => ConsoleInput::Status,
        "quit" | "exit" => ConsoleInput::Quit,
        "help" => ConsoleInput::Help,
        _ => ConsoleInput::Unknown(line.to_string()),
    }
}

const HELP: &str = "\
Commands:
  <text>                 chat as yourself (not relayed)
  /as <name>: <text>     chat as a character (relayed to Discord)
  /system <text>         post a system message (not relayed)
  /token <value>         set the Bot Token
  /channel <value>       set the Channel ID
  /connect               connect to Discord
  /settings              show settings
  /status                show the Discord connection state
  /quit                  exit";

/// Read stdin until EOF or `/quit`.
pub async fn run_console(events: EventSource<HostMessage>, handle: AdapterHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            ConsoleInput::Message(message) => {
                if message.is_user {
                    println!("[{}] {}", message.name, message.mes);
                }
                events.emit(message);
            }
            ConsoleInput::SetToken(value) => {
                if handle.edit_bot_token(value).is_err() {
                    break;
                }
            }
            ConsoleInput::SetChannel(value) => {
                if handle.edit_channel_id(value).is_err() {
                    break;
                }
            }
            ConsoleInput::Connect => match handle.connect().await {
                Ok(outcome) => match outcome.channel {
                    Some(channel) => println!(
                        "Connected as {} to #{} ({})",
                        outcome.user_tag, channel.name, channel.id
                    ),
                    None => println!(
                        "Connected as {}, but the channel was not found",
                        outcome.user_tag
                    ),
                },
                Err(e) => println!("Connect failed: {}", e),
            },
            ConsoleInput::ShowSettings => match handle.fields().await {
                Ok(fields) => {
                    for field in fields {
                        println!("{}: {}", field.label, field.value);
                    }
                }
                Err(_) => break,
            },
            ConsoleInput::Status => match handle.status().await {
                Ok(state) => println!("Discord: {}", state),
                Err(_) => break,
            },
            ConsoleInput::Quit => {
                info!("Quit requested");
                break;
            }
            ConsoleInput::Help => println!("{}", HELP),
            ConsoleInput::Empty => {}
            ConsoleInput::Unknown(line) => println!("Unknown command: {} (try /help)", line),
        }
    }
}
