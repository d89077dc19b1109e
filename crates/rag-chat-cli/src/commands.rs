//! Command parser for the interactive chat loop
//!
//! Commands are case-insensitive and may be typed with or without a leading
//! `/`. Anything that is not a command is treated as a question.

use rag_conversation::services::conversation::Exchange;
use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;

const ANSWER_PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}\n\nType 'help' to see available commands")]
    UnknownCommand(String),

    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    #[error("Invalid argument for {command}: {arg}\n\nUsage: {usage}")]
    InvalidArgument {
        command: String,
        arg: String,
        usage: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Leave the session (`back`, `exit`, `quit`)
    Exit,
    History,
    /// Drop the history and start a new session id
    Clear,
    Save(Option<PathBuf>),
    Load(PathBuf),
    Window(usize),
    Help,
    /// Not a command: send to the assistant
    Question(String),
}

pub fn parse_command(input: &str) -> Result<ChatCommand, CommandError> {
    let trimmed = input.trim();
    let slashed = trimmed.starts_with('/');
    let body = trimmed.trim_start_matches('/');

    let (word, arg) = match body.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (body.to_lowercase(), ""),
    };

    let command = match (word.as_str(), arg.is_empty()) {
        ("back" | "exit" | "quit", true) => ChatCommand::Exit,
        ("history", true) => ChatCommand::History,
        ("clear", true) => ChatCommand::Clear,
        ("help", true) => ChatCommand::Help,
        ("save", true) => ChatCommand::Save(None),
        ("save", false) => ChatCommand::Save(Some(PathBuf::from(arg))),
        ("load", true) => {
            return Err(CommandError::MissingArgument {
                command: "load".to_string(),
                usage: "load <file>".to_string(),
            })
        }
        ("load", false) => ChatCommand::Load(PathBuf::from(arg)),
        ("window", true) => {
            return Err(CommandError::MissingArgument {
                command: "window".to_string(),
                usage: "window <1-10>".to_string(),
            })
        }
        ("window", false) => match arg.parse::<usize>() {
            Ok(n) => ChatCommand::Window(n),
            Err(_) if !slashed => ChatCommand::Question(trimmed.to_string()),
            Err(_) => {
                return Err(CommandError::InvalidArgument {
                    command: "window".to_string(),
                    arg: arg.to_string(),
                    usage: "window <1-10>".to_string(),
                })
            }
        },
        _ if slashed => return Err(CommandError::UnknownCommand(trimmed.to_string())),
        _ => ChatCommand::Question(trimmed.to_string()),
    };

    Ok(command)
}

/// Numbered transcript with answers cut to a short preview
pub fn format_history(history: &[Exchange]) -> String {
    if history.is_empty() {
        return "No conversation history yet.".to_string();
    }

    let mut out = String::new();
    for (i, exchange) in history.iter().enumerate() {
        let _ = writeln!(out, "{}. Q: {}", i + 1, exchange.question);
        let _ = writeln!(out, "   A: {}", preview(&exchange.answer));
        if !exchange.sources.is_empty() {
            let _ = writeln!(out, "   Sources: {}", exchange.sources.join(", "));
        }
    }
    out
}

fn preview(answer: &str) -> String {
    if answer.chars().count() > ANSWER_PREVIEW_CHARS {
        format!("{}...", answer.chars().take(ANSWER_PREVIEW_CHARS).collect::<String>())
    } else {
        answer.to_string()
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("  history          Show this conversation");
    println!("  clear            Forget the conversation and start a new one");
    println!("  save [file]      Save the conversation (default conversation_<id>.json)");
    println!("  load <file>      Continue a saved conversation");
    println!("  window <n>       Use the last n exchanges as context (1-10)");
    println!("  help             Show this help");
    println!("  back/exit/quit   Leave the session");
    println!();
    println!("Anything else is sent as a question.");
}
