mod fetcher;
mod parser;

use std::sync::Arc;
use std::time::Instant;

pub use fetcher::{PageSource, SourceFetcher};
pub use parser::{parse_page, BlockResult, StationBlock, CONTAINER_ID};

use crate::db::{InsertOutcome, Repository};
use crate::error::{ParseError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub container_found: bool,
    pub stations_seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetches the overview page and appends new readings to the store.
pub struct Scraper {
    source: Arc<dyn PageSource>,
    repository: Repository,
}

impl Scraper {
    pub fn new(source: Arc<dyn PageSource>, repository: Repository) -> Self {
        Self { source, repository }
    }

    /// One scrape. A page without the station container is logged and yields
    /// an empty report; fetch and store failures abort the run with an error.
    pub async fn run(&self) -> Result<ScrapeReport> {
        let started = Instant::now();
        tracing::info!("Starting data scrape");

        let html = self.source.fetch_page().await?;
        let blocks = match parse_page(&html) {
            Ok(blocks) => blocks,
            Err(e @ ParseError::MissingContainer(_)) => {
                tracing::error!("Station data not found on the page: {}", e);
                return Ok(ScrapeReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = ScrapeReport {
            container_found: true,
            ..ScrapeReport::default()
        };

        for block in blocks {
            report.stations_seen += 1;
            match block {
                Ok(StationBlock::Reading(reading)) => {
                    let station_id = reading.station_id.clone();
                    let observed = reading.observed_at.raw.clone();
                    match self.repository.insert_reading(reading).await? {
                        InsertOutcome::Inserted(id) => {
                            report.inserted += 1;
                            tracing::info!("{}: new data #{} for '{}'", station_id, id, observed);
                        }
                        InsertOutcome::Duplicate => {
                            report.duplicates += 1;
                            tracing::debug!("{}: data for '{}' already stored", station_id, observed);
                        }
                    }
                }
                Ok(StationBlock::Maintenance { index }) => {
                    report.skipped += 1;
                    tracing::info!("Station {}: under maintenance, skipping", index);
                }
                Ok(StationBlock::Unmapped { index, name }) => {
                    report.skipped += 1;
                    tracing::warn!("Station {}: no mapping for '{}'", index, name);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Skipping station block: {}", e);
                }
            }
        }

        tracing::info!(
            "Scrape complete in {:.2?}: {} stations, {} new, {} duplicate, {} skipped, {} failed",
            started.elapsed(),
            report.stations_seen,
            report.inserted,
            report.duplicates,
            report.skipped,
            report.failed
        );

        Ok(report)
    }
}
