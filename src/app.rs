use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bot::{
    format_history, parse_callback, parse_message, BotAction, CommandHandler, Reply, HISTORY_LIMIT,
};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{PreconditionError, Result};
use crate::feed::{ScrapeReport, Scraper, SourceFetcher};
use crate::models::Station;
use crate::services::{Deliverer, LogDeliverer, NotifyReport, Notifier, TelegramClient, Update};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub const USAGE: &str = "Usage: cydust [--scrape | --notify | --check <station>]";

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Daemon,
    Scrape,
    Notify,
    Check(String),
}

impl Mode {
    /// Parses arguments after the program name. The error is the message to print.
    pub fn from_args(args: &[String]) -> std::result::Result<Self, String> {
        match args.first().map(String::as_str) {
            None => Ok(Self::Daemon),
            Some("--scrape") => Ok(Self::Scrape),
            Some("--notify") => Ok(Self::Notify),
            Some("--check") => {
                let query = args[1..].join(" ");
                if query.trim().is_empty() {
                    Err(format!("--check needs a station name, e.g. --check Limassol\n{USAGE}"))
                } else {
                    Ok(Self::Check(query.trim().to_string()))
                }
            }
            Some(other) => Err(format!("Unknown argument {other}\n{USAGE}")),
        }
    }
}

/// First instant strictly after `now` whose minute-of-hour is `minute`.
pub fn next_run_after(now: DateTime<Utc>, minute: u32) -> DateTime<Utc> {
    let hour_start = now
        - TimeDelta::minutes(i64::from(now.minute()))
        - TimeDelta::seconds(i64::from(now.second()))
        - TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    let candidate = hour_start + TimeDelta::minutes(i64::from(minute));
    if candidate > now {
        candidate
    } else {
        candidate + TimeDelta::hours(1)
    }
}

/// Next slot after both `now` and the slot that last fired, so a clock
/// stepped backwards can't fire the same slot twice.
fn next_slot(now: DateTime<Utc>, last_fired: Option<DateTime<Utc>>, minute: u32) -> DateTime<Utc> {
    let from = last_fired.map_or(now, |last| now.max(last));
    next_run_after(from, minute)
}

pub struct App {
    config: Config,
    repository: Repository,
    scraper: Arc<Scraper>,
    notifier: Arc<Notifier>,
    telegram: Option<Arc<TelegramClient>>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        // Storage and scraping
        let repository = Repository::new(&config.db_path).await?;
        let fetcher = SourceFetcher::new(config.source_url.clone(), config.request_timeout())?;
        let scraper = Scraper::new(Arc::new(fetcher), repository.clone());

        // Telegram is optional; without it deliveries go to the log
        let telegram = config
            .telegram_token
            .as_ref()
            .map(|token| TelegramClient::new(token.clone(), config.request_timeout()))
            .transpose()?
            .map(Arc::new);

        let deliverer: Arc<dyn Deliverer> = match &telegram {
            Some(client) => client.clone() as Arc<dyn Deliverer>,
            None => {
                tracing::warn!("No telegram_token configured, notifications will only be logged");
                Arc::new(LogDeliverer)
            }
        };
        let notifier = Notifier::new(repository.clone(), deliverer, config.delivery_timeout());

        Ok(Self {
            config,
            repository,
            scraper: Arc::new(scraper),
            notifier: Arc::new(notifier),
            telegram,
        })
    }

    pub async fn scrape_once(&self) -> Result<ScrapeReport> {
        self.scraper.run().await
    }

    pub async fn notify_once(&self) -> Result<NotifyReport> {
        self.notifier.run().await
    }

    /// Recent observations for the first station whose name contains `query`.
    pub async fn history(&self, query: &str) -> Result<String> {
        let station = Station::search(query)
            .ok_or_else(|| PreconditionError::UnknownStation(query.to_string()))?;
        let readings = self.repository.recent_readings(station.id, HISTORY_LIMIT).await?;
        Ok(format_history(station, &readings, chrono::Local::now()))
    }

    /// Runs scraper, notifier and (with a token) the command loop until
    /// Ctrl-C. Runs already in progress finish before this returns.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        // Scraper: once now, then hourly
        let scraper = self.scraper.clone();
        tasks.push(tokio::spawn(run_hourly(
            "scrape",
            self.config.scrape_minute,
            true,
            shutdown_rx.clone(),
            move || {
                let scraper = scraper.clone();
                async move { scraper.run().await }
            },
        )));

        // Notifier: hourly only
        let notifier = self.notifier.clone();
        tasks.push(tokio::spawn(run_hourly(
            "notify",
            self.config.notify_minute,
            false,
            shutdown_rx.clone(),
            move || {
                let notifier = notifier.clone();
                async move { notifier.run().await }
            },
        )));

        // Command loop, only with a bot token
        if let Some(client) = &self.telegram {
            let handler = CommandHandler::new(self.repository.clone());
            tasks.push(tokio::spawn(poll_updates(
                client.clone(),
                handler,
                self.config.poll_timeout(),
                shutdown_rx.clone(),
            )));
        }

        tracing::info!("cydust running with {} tasks, press Ctrl-C to stop", tasks.len());
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");
        let _ = shutdown_tx.send(true);

        // Wait for in-flight runs to finish
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("Task ended abnormally: {}", e);
            }
        }
        Ok(())
    }
}

async fn run_hourly<F, Fut, T>(
    name: &'static str,
    minute: u32,
    run_immediately: bool,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if run_immediately {
        if let Err(e) = job().await {
            tracing::error!("Initial {} run failed: {}", name, e);
        }
    }

    let mut last_fired = None;
    loop {
        let now = Utc::now();
        let next = next_slot(now, last_fired, minute);
        tracing::debug!("Next {} run at {}", name, next);
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
        last_fired = Some(next);

        // A failed run is logged; the loop keeps its schedule
        if let Err(e) = job().await {
            tracing::error!("{} run failed: {}", name, e);
        }
    }
    tracing::info!("{} loop stopped", name);
}

async fn poll_updates(
    client: Arc<TelegramClient>,
    handler: CommandHandler,
    poll_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut offset = 0;
    loop {
        let result = tokio::select! {
            result = client.get_updates(offset, poll_timeout) => result,
            _ = shutdown.changed() => break,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    // Acknowledge everything up to this update on the next poll
                    offset = offset.max(update.update_id + 1);
                    handle_update(&client, &handler, update).await;
                }
            }
            Err(e) => {
                tracing::warn!("Polling for updates failed: {}", e);
                tokio::select! {
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }
    }
    tracing::info!("command loop stopped");
}

async fn handle_update(client: &TelegramClient, handler: &CommandHandler, update: Update) {
    if let Some(callback) = update.callback_query {
        if let Err(e) = client.answer_callback_query(&callback.id, None).await {
            tracing::warn!("Failed to answer callback {}: {}", callback.id, e);
        }
        match callback.data.as_deref().and_then(parse_callback) {
            Some(action) => respond(client, handler, callback.chat_id(), action).await,
            None => tracing::debug!("Ignoring callback data {:?}", callback.data),
        }
    } else if let Some(message) = update.message {
        if let Some(action) = message.text.as_deref().and_then(parse_message) {
            respond(client, handler, message.chat.id, action).await;
        }
    }
}

async fn respond(client: &TelegramClient, handler: &CommandHandler, recipient_id: i64, action: BotAction) {
    let reply = match handler.handle(recipient_id, action).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("Error handling command from {}: {}", recipient_id, e);
            Reply {
                text: "An error occurred. Please try again.".to_string(),
                markup: None,
            }
        }
    };

    if let Err(e) = client
        .send_message(recipient_id, &reply.text, reply.markup.as_ref())
        .await
    {
        tracing::error!("Failed to reply to {}: {}", recipient_id, e);
    }
}
