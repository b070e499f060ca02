use crate::models::StatusFilter;

const FILTER_CALLBACK_PREFIX: &str = "filter_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    Start,
    Help,
    Subscribe,
    Unsubscribe,
    /// `/filter` with an optional filter name.
    Filter(Option<String>),
    Status,
    /// `/check` with an optional station query.
    Check(Option<String>),
    // Inline keyboard
    SetFilter(StatusFilter),
    // Plain text, expected to be a station name from the keyboard
    SelectStation(String),
    Unknown(String),
}

pub fn parse_message(text: &str) -> Option<BotAction> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(command) = text.strip_prefix('/') else {
        return Some(BotAction::SelectStation(text.to_string()));
    };

    let (name, args) = match command.split_once(char::is_whitespace) {
        Some((name, args)) => (name, Some(args.trim().to_string()).filter(|a| !a.is_empty())),
        None => (command, None),
    };
    // Group chats address commands as /name@bot
    let name = name.split('@').next().unwrap_or(name).to_lowercase();

    let action = match name.as_str() {
        "start" | "restart" => BotAction::Start,
        "help" => BotAction::Help,
        "subscribe" => BotAction::Subscribe,
        "unsubscribe" => BotAction::Unsubscribe,
        "filter" => BotAction::Filter(args),
        "status" => BotAction::Status,
        "check" => BotAction::Check(args),
        _ => BotAction::Unknown(text.to_string()),
    };
    Some(action)
}

pub fn parse_callback(data: &str) -> Option<BotAction> {
    data.strip_prefix(FILTER_CALLBACK_PREFIX)
        .and_then(StatusFilter::parse)
        .map(BotAction::SetFilter)
}

pub fn filter_callback_data(filter: StatusFilter) -> String {
    format!("{}{}", FILTER_CALLBACK_PREFIX, filter.as_str())
}
