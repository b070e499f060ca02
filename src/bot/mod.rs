mod commands;
mod handler;

pub use commands::{format_history, help_text, CommandHandler, Reply, HISTORY_LIMIT};
pub use handler::{parse_callback, parse_message, BotAction};
