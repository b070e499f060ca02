use chrono::{DateTime, Local};

use crate::config::DEFAULT_SOURCE_URL;
use crate::db::Repository;
use crate::error::{AppError, PreconditionError, Result};
use crate::models::{Reading, Station, StatusFilter};
use crate::services::{station_bulletin, ReplyMarkup, Subscriptions};

use super::handler::{filter_callback_data, BotAction};

pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    fn with_markup(text: impl Into<String>, markup: ReplyMarkup) -> Self {
        Self {
            text: text.into(),
            markup: Some(markup),
        }
    }
}

pub fn station_keyboard() -> ReplyMarkup {
    ReplyMarkup::keyboard(Station::all().iter().map(|s| s.display_name))
}

pub fn filter_keyboard() -> ReplyMarkup {
    ReplyMarkup::inline(
        StatusFilter::ALL
            .iter()
            .map(|f| (f.label().to_string(), filter_callback_data(*f))),
    )
}

pub fn help_text() -> String {
    format!(
        "/start to start the bot and choose desired station.\n\
         /subscribe to get hourly notifications.\n\
         /unsubscribe to stop receiving hourly notifications.\n\
         /filter to set notification filter by status color.\n\
         /status to check your current settings.\n\
         /check to see the latest stored observations.\n\
         /restart to start from the beginning.\n\
         /help for help.\n\n\
         Data source: {}",
        DEFAULT_SOURCE_URL.trim_end_matches('/')
    )
}

/// Last few stored observation times for a station, newest first.
pub fn format_history(station: &Station, readings: &[Reading], now: DateTime<Local>) -> String {
    if readings.is_empty() {
        return format!("No data stored yet for {}.", station.display_name);
    }

    let mut message = format!("Last {} entries for {}:\n\n", readings.len(), station.display_name);
    for reading in readings {
        message.push_str(&format!(
            "ID: {} - Time: {} {}\n",
            reading.id,
            reading.observed_at,
            reading.status.emoji()
        ));
    }
    message.push_str(&format!("\nCurrent time: {}", now.format("%d/%m/%Y %H:%M")));
    message
}

/// Turns chat actions into replies. Subscription rules live in
/// `Subscriptions`; this layer only words the outcome.
#[derive(Clone)]
pub struct CommandHandler {
    repository: Repository,
    subscriptions: Subscriptions,
}

impl CommandHandler {
    pub fn new(repository: Repository) -> Self {
        let subscriptions = Subscriptions::new(repository.clone());
        Self {
            repository,
            subscriptions,
        }
    }

    pub async fn handle(&self, recipient_id: i64, action: BotAction) -> Result<Reply> {
        let reply = match action {
            BotAction::Start => Reply::with_markup("Please select a station:", station_keyboard()),
            BotAction::Help => Reply::text(help_text()),
            BotAction::SelectStation(name) => self.select(recipient_id, &name).await?,
            BotAction::Subscribe => self.subscribe(recipient_id).await?,
            BotAction::Unsubscribe => self.unsubscribe(recipient_id).await?,
            BotAction::Filter(None) => self.filter_prompt(recipient_id).await?,
            BotAction::Filter(Some(name)) => match StatusFilter::parse(&name) {
                Some(filter) => self.set_filter(recipient_id, filter).await?,
                None => Reply::with_markup(
                    format!("Unknown filter \"{}\". Choose one:", name),
                    filter_keyboard(),
                ),
            },
            BotAction::SetFilter(filter) => self.set_filter(recipient_id, filter).await?,
            BotAction::Status => self.status(recipient_id).await?,
            BotAction::Check(query) => self.check(recipient_id, query.as_deref()).await?,
            BotAction::Unknown(command) => {
                tracing::debug!("{}: unknown command {}", recipient_id, command);
                Reply::text("Unknown command. Use /help to see what I can do.")
            }
        };
        Ok(reply)
    }

    async fn select(&self, recipient_id: i64, name: &str) -> Result<Reply> {
        let Some(station) = Station::from_display_name(name) else {
            return Ok(Reply::text(
                "Station not found. Please enter the correct name or use the command keyboard.",
            ));
        };
        self.subscriptions.select(recipient_id, station.id).await?;

        let reply = match station_bulletin(&self.repository, station).await? {
            Some(bulletin) => Reply::text(format!(
                "{}\n\nUse /subscribe for hourly updates, or /filter for alerts only.",
                bulletin.text
            )),
            None => Reply::text("No data found for this station."),
        };
        Ok(reply)
    }

    async fn subscribe(&self, recipient_id: i64) -> Result<Reply> {
        match self.subscriptions.subscribe(recipient_id).await {
            Ok(true) => Ok(Reply::text("You are now subscribed to hourly updates.")),
            Ok(false) => Ok(Reply::text("You are already subscribed to hourly updates.")),
            Err(e) => precondition_reply(e),
        }
    }

    async fn unsubscribe(&self, recipient_id: i64) -> Result<Reply> {
        match self.subscriptions.unsubscribe(recipient_id).await {
            Ok(()) => Ok(Reply::text("You have unsubscribed from hourly updates.")),
            Err(e) => precondition_reply(e),
        }
    }

    async fn filter_prompt(&self, recipient_id: i64) -> Result<Reply> {
        if !self.subscriptions.get_status(recipient_id).await?.subscribed {
            return precondition_reply(PreconditionError::NotSubscribed.into());
        }
        Ok(Reply::with_markup(
            "Select which air quality statuses you want to be notified about:",
            filter_keyboard(),
        ))
    }

    async fn set_filter(&self, recipient_id: i64, filter: StatusFilter) -> Result<Reply> {
        match self.subscriptions.set_filter(recipient_id, filter).await {
            Ok(()) => Ok(Reply::text(format!("Filter updated! {}", filter.confirmation()))),
            Err(e) => precondition_reply(e),
        }
    }

    async fn status(&self, recipient_id: i64) -> Result<Reply> {
        let status = self.subscriptions.get_status(recipient_id).await?;
        let Some(station) = status.station else {
            return Ok(Reply::text("You have not selected a station yet. Use /start to begin."));
        };

        let subscription = if status.subscribed {
            "subscribed to hourly updates"
        } else {
            "not subscribed (use /subscribe)"
        };
        Ok(Reply::text(format!(
            "Your current settings:\n\n\
             📍 Station: {}\n\
             🔔 Notifications: {}\n\
             🎚 Notification filter: {}\n\n\
             Use /filter to change notification preferences.",
            station.display_name,
            subscription,
            status.filter.label()
        )))
    }

    async fn check(&self, recipient_id: i64, query: Option<&str>) -> Result<Reply> {
        let station = match query {
            Some(query) => match Station::search(query) {
                Some(station) => station,
                None => {
                    let names = Station::all()
                        .iter()
                        .map(|s| s.display_name)
                        .collect::<Vec<_>>()
                        .join("\n");
                    return Ok(Reply::text(format!(
                        "Station \"{}\" not found.\n\nAvailable stations:\n{}",
                        query, names
                    )));
                }
            },
            None => match self.subscriptions.get_status(recipient_id).await?.station {
                Some(station) => station,
                None => {
                    return Ok(Reply::text(
                        "Please select a station first using /start or provide station name: /check Limassol",
                    ))
                }
            },
        };

        let readings = self.repository.recent_readings(station.id, HISTORY_LIMIT).await?;
        Ok(Reply::text(format_history(station, &readings, Local::now())))
    }
}

fn precondition_reply(error: AppError) -> Result<Reply> {
    match error {
        AppError::Precondition(PreconditionError::NoStationSelected) => Ok(Reply::text(
            "Please select a station first using the /start command.",
        )),
        AppError::Precondition(PreconditionError::NotSubscribed) => Ok(Reply::text(
            "You are not subscribed. Use /start and /subscribe first.",
        )),
        AppError::Precondition(PreconditionError::UnknownStation(name)) => {
            Ok(Reply::text(format!("Unknown station \"{}\".", name)))
        }
        other => Err(other),
    }
}
