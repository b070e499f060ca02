use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::Repository;
use crate::error::{DeliveryError, Result};
use crate::models::{Pollutant, Reading, Severity, Station};

use super::classifier::{classify, Classification};
use super::delivery::Deliverer;

/// Formatted latest reading for one station.
#[derive(Debug, Clone, PartialEq)]
pub struct Bulletin {
    pub station: &'static Station,
    pub status: Severity,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub stations_with_data: usize,
    pub delivered: usize,
    pub filtered: usize,
    pub no_data: usize,
    pub failed: usize,
}

pub fn format_bulletin(station: &Station, reading: &Reading, classification: &Classification) -> String {
    let mut parts = vec![format!(
        "📍 {}\nStatus: {}",
        station.display_name,
        reading.status.emoji()
    )];

    if let Some(message) = &classification.message {
        parts.push(message.clone());
    }

    let listing = Pollutant::ALL
        .iter()
        .map(|p| format!("{}: {}", p.label(), reading.value(*p).unwrap_or("None")))
        .collect::<Vec<_>>()
        .join("\n");
    parts.push(listing);
    parts.push(format!("Timestamp: {}", reading.observed_at));

    parts.join("\n\n")
}

/// Latest stored reading for a station, classified and formatted.
pub async fn station_bulletin(
    repository: &Repository,
    station: &'static Station,
) -> Result<Option<Bulletin>> {
    let Some(reading) = repository.latest_reading(station.id).await? else {
        return Ok(None);
    };
    let classification = classify(&reading);
    Ok(Some(Bulletin {
        station,
        status: reading.status,
        text: format_bulletin(station, &reading, &classification),
    }))
}

pub struct Notifier {
    repository: Repository,
    deliverer: Arc<dyn Deliverer>,
    delivery_timeout: Duration,
}

impl Notifier {
    pub fn new(repository: Repository, deliverer: Arc<dyn Deliverer>, delivery_timeout: Duration) -> Self {
        Self {
            repository,
            deliverer,
            delivery_timeout,
        }
    }

    /// One bulletin per station with data, built once per run.
    pub async fn bulletins(&self) -> Result<HashMap<&'static str, Bulletin>> {
        let mut bulletins = HashMap::new();
        for station in Station::all() {
            if let Some(bulletin) = station_bulletin(&self.repository, station).await? {
                bulletins.insert(station.id, bulletin);
            }
        }
        Ok(bulletins)
    }

    /// Sends each subscriber the bulletin of their station when their filter
    /// matches. A failed delivery is logged and the run moves on.
    pub async fn run(&self) -> Result<NotifyReport> {
        let started = Instant::now();
        tracing::info!("Starting hourly notifications");

        let bulletins = self.bulletins().await?;
        let subscribers = self.repository.active_subscribers().await?;

        let mut report = NotifyReport {
            stations_with_data: bulletins.len(),
            ..NotifyReport::default()
        };

        for subscriber in subscribers {
            let recipient = subscriber.recipient_id;
            let Some(bulletin) = subscriber
                .selected_station
                .as_deref()
                .and_then(|id| bulletins.get(id))
            else {
                report.no_data += 1;
                tracing::warn!(
                    "No data available for station {:?} of {}",
                    subscriber.selected_station,
                    recipient
                );
                continue;
            };

            if !subscriber.status_filter.matches(bulletin.status) {
                report.filtered += 1;
                tracing::debug!(
                    "Skipping {}: status {} doesn't match filter {}",
                    recipient,
                    bulletin.status,
                    subscriber.status_filter.as_str()
                );
                continue;
            }

            match self.deliver(recipient, &bulletin.text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Error sending hourly message: {}", e);
                }
            }
        }

        tracing::info!(
            "Hourly notifications complete in {:.2?}: {} delivered, {} filtered, {} without data, {} failed",
            started.elapsed(),
            report.delivered,
            report.filtered,
            report.no_data,
            report.failed
        );

        Ok(report)
    }

    async fn deliver(&self, recipient: i64, text: &str) -> std::result::Result<(), DeliveryError> {
        tokio::time::timeout(self.delivery_timeout, self.deliverer.deliver(recipient, text))
            .await
            .map_err(|_| DeliveryError::Timeout { recipient })?
    }
}
