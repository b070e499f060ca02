use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, ToSql};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{NewReading, Pollutant, Reading, Severity, StatusFilter, Subscriber};

use super::schema::SCHEMA;

const SUBSCRIBER_COLUMNS: &str = "recipient_id, selected_station, subscribed, status_filter, updated_at";

/// Result of appending a scraped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
    NoStationSelected,
}

/// Both durable stores behind one serialized SQLite connection.
///
/// Every method is a single `call` on the connection actor, so each one is
/// atomic with respect to the scraper, the notifier and command handling.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Reading operations

    /// Appends the reading unless the station already has one for the same
    /// observation time. Check and insert share one transaction.
    pub async fn insert_reading(&self, reading: NewReading) -> Result<InsertOutcome> {
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM readings WHERE station_id = ?1 AND (observed_key = ?2 OR observed_at = ?3))",
                    params![reading.station_id, reading.observed_at.key, reading.observed_at.raw],
                    |row| row.get(0),
                )?;
                if exists {
                    return Ok(InsertOutcome::Duplicate);
                }

                let values: Vec<Option<String>> = Pollutant::ALL
                    .iter()
                    .map(|p| reading.pollutants.get(p).cloned())
                    .collect();
                let status = reading.status.as_str();

                let mut args: Vec<&dyn ToSql> = vec![&reading.station_id as &dyn ToSql, &status];
                args.extend(values.iter().map(|v| v as &dyn ToSql));
                args.push(&reading.observed_at.raw);
                args.push(&reading.observed_at.key);

                let placeholders = (1..=args.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                tx.execute(
                    &format!(
                        "INSERT INTO readings (station_id, status, {}, observed_at, observed_key) VALUES ({})",
                        pollutant_columns(),
                        placeholders
                    ),
                    args.as_slice(),
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(InsertOutcome::Inserted(id))
            })
            .await?;
        Ok(outcome)
    }

    pub async fn latest_reading(&self, station_id: &str) -> Result<Option<Reading>> {
        let station_id = station_id.to_string();
        let reading = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM readings WHERE station_id = ?1 ORDER BY id DESC LIMIT 1",
                    reading_columns()
                ))?;
                let reading = stmt
                    .query_row(params![station_id], reading_from_row)
                    .optional()?;
                Ok(reading)
            })
            .await?;
        Ok(reading)
    }

    /// Most recent first.
    pub async fn recent_readings(&self, station_id: &str, limit: usize) -> Result<Vec<Reading>> {
        let station_id = station_id.to_string();
        let limit = limit as i64;
        let readings = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM readings WHERE station_id = ?1 ORDER BY id DESC LIMIT ?2",
                    reading_columns()
                ))?;
                let readings = stmt
                    .query_map(params![station_id, limit], reading_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(readings)
            })
            .await?;
        Ok(readings)
    }

    pub async fn count_readings(&self, station_id: &str) -> Result<i64> {
        let station_id = station_id.to_string();
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM readings WHERE station_id = ?1",
                    params![station_id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Subscriber operations

    pub async fn select_station(&self, recipient_id: i64, station_id: &str) -> Result<()> {
        let station_id = station_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO subscribers (recipient_id, selected_station) VALUES (?1, ?2)
                       ON CONFLICT(recipient_id) DO UPDATE SET
                           selected_station = excluded.selected_station,
                           updated_at = datetime('now')"#,
                    params![recipient_id, station_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn subscribe(&self, recipient_id: i64) -> Result<SubscribeOutcome> {
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let row: Option<(Option<String>, bool)> = tx
                    .query_row(
                        "SELECT selected_station, subscribed FROM subscribers WHERE recipient_id = ?1",
                        params![recipient_id],
                        |row| Ok((row.get(0)?, row.get::<_, i64>(1)? != 0)),
                    )
                    .optional()?;

                let outcome = match row {
                    None | Some((None, _)) => SubscribeOutcome::NoStationSelected,
                    Some((Some(_), true)) => SubscribeOutcome::AlreadySubscribed,
                    Some((Some(_), false)) => {
                        tx.execute(
                            "UPDATE subscribers SET subscribed = 1, updated_at = datetime('now') WHERE recipient_id = ?1",
                            params![recipient_id],
                        )?;
                        SubscribeOutcome::Subscribed
                    }
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await?;
        Ok(outcome)
    }

    /// Deletes the recipient's row. Returns `false` when there was no active
    /// subscription, in which case nothing changes.
    pub async fn unsubscribe(&self, recipient_id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM subscribers WHERE recipient_id = ?1 AND subscribed = 1",
                    params![recipient_id],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// Returns `false` (store untouched) unless the recipient is subscribed.
    pub async fn set_filter(&self, recipient_id: i64, filter: StatusFilter) -> Result<bool> {
        let updated = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE subscribers SET status_filter = ?1, updated_at = datetime('now') WHERE recipient_id = ?2 AND subscribed = 1",
                    params![filter.as_str(), recipient_id],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(updated)
    }

    pub async fn get_subscriber(&self, recipient_id: i64) -> Result<Option<Subscriber>> {
        let subscriber = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE recipient_id = ?1"
                ))?;
                let subscriber = stmt
                    .query_row(params![recipient_id], subscriber_from_row)
                    .optional()?;
                Ok(subscriber)
            })
            .await?;
        Ok(subscriber)
    }

    pub async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        let subscribers = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE subscribed = 1 AND selected_station IS NOT NULL ORDER BY recipient_id"
                ))?;
                let subscribers = stmt
                    .query_map([], subscriber_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscribers)
            })
            .await?;
        Ok(subscribers)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn pollutant_columns() -> String {
    Pollutant::ALL
        .iter()
        .map(|p| p.column())
        .collect::<Vec<_>>()
        .join(", ")
}

fn reading_columns() -> String {
    format!(
        "id, station_id, status, {}, observed_at, fetched_at",
        pollutant_columns()
    )
}

fn reading_from_row(row: &Row) -> rusqlite::Result<Reading> {
    let mut pollutants = BTreeMap::new();
    for pollutant in Pollutant::ALL {
        if let Some(value) = row.get::<_, Option<String>>(pollutant.column())? {
            pollutants.insert(pollutant, value);
        }
    }

    Ok(Reading {
        id: row.get("id")?,
        station_id: row.get("station_id")?,
        status: Severity::parse(&row.get::<_, String>("status")?),
        pollutants,
        observed_at: row.get("observed_at")?,
        fetched_at: row
            .get::<_, String>("fetched_at")
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn subscriber_from_row(row: &Row) -> rusqlite::Result<Subscriber> {
    Ok(Subscriber {
        recipient_id: row.get(0)?,
        selected_station: row.get(1)?,
        subscribed: row.get::<_, i64>(2)? != 0,
        status_filter: StatusFilter::parse(&row.get::<_, String>(3)?).unwrap_or_default(),
        updated_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservedAt;

    fn reading(station_id: &str, observed: &str, pm10: &str) -> NewReading {
        NewReading {
            station_id: station_id.to_string(),
            status: Severity::Yellow,
            pollutants: BTreeMap::from([
                (Pollutant::Pm10, pm10.to_string()),
                (Pollutant::Co, "300 µg/m³".to_string()),
            ]),
            observed_at: ObservedAt::parse(observed),
        }
    }

    #[tokio::test]
    async fn duplicate_observation_is_not_stored_twice() {
        let repo = Repository::open_in_memory().await.unwrap();

        let first = repo
            .insert_reading(reading("station01", "Updated on: 24/05/2025 17:00", "55"))
            .await
            .unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let again = repo
            .insert_reading(reading("station01", "24/05/2025 17:00", "56"))
            .await
            .unwrap();
        assert_eq!(again, InsertOutcome::Duplicate);

        // Same time at another station is a different key.
        let other = repo
            .insert_reading(reading("station02", "24/05/2025 17:00", "56"))
            .await
            .unwrap();
        assert!(matches!(other, InsertOutcome::Inserted(_)));

        assert_eq!(repo.count_readings("station01").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dedup_checks_every_stored_observation() {
        let repo = Repository::open_in_memory().await.unwrap();
        for observed in ["24/05/2025 16:00", "24/05/2025 17:00"] {
            repo.insert_reading(reading("station03", observed, "40"))
                .await
                .unwrap();
        }

        // Older than the latest row, still a duplicate.
        let outcome = repo
            .insert_reading(reading("station03", "24/05/2025 16:00", "40"))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(repo.count_readings("station03").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn every_pollutant_column_is_stored() {
        let repo = Repository::open_in_memory().await.unwrap();
        let mut new = reading("station08", "24/05/2025 16:00", "41");
        new.pollutants = Pollutant::ALL
            .into_iter()
            .map(|p| (p, format!("{} value", p.column())))
            .collect();
        repo.insert_reading(new).await.unwrap();

        let stored = repo.latest_reading("station08").await.unwrap().unwrap();
        for pollutant in Pollutant::ALL {
            assert_eq!(
                stored.value(pollutant),
                Some(format!("{} value", pollutant.column()).as_str())
            );
        }
        assert_eq!(stored.status, Severity::Yellow);
        assert_eq!(stored.observed_at, "24/05/2025 16:00");
    }

    #[tokio::test]
    async fn latest_reading_round_trips_values() {
        let repo = Repository::open_in_memory().await.unwrap();
        assert!(repo.latest_reading("station01").await.unwrap().is_none());

        repo.insert_reading(reading("station01", "24/05/2025 16:00", "41"))
            .await
            .unwrap();
        repo.insert_reading(reading("station01", "24/05/2025 17:00", "42"))
            .await
            .unwrap();

        let latest = repo.latest_reading("station01").await.unwrap().unwrap();
        assert_eq!(latest.observed_at, "24/05/2025 17:00");
        assert_eq!(latest.status, Severity::Yellow);
        assert_eq!(latest.value(Pollutant::Pm10), Some("42"));
        assert_eq!(latest.value(Pollutant::Co), Some("300 µg/m³"));
        assert_eq!(latest.value(Pollutant::O3), None);

        let recent = repo.recent_readings("station01", 5).await.unwrap();
        let times: Vec<_> = recent.iter().map(|r| r.observed_at.as_str()).collect();
        assert_eq!(times, vec!["24/05/2025 17:00", "24/05/2025 16:00"]);
    }

    #[tokio::test]
    async fn subscribe_requires_selection() {
        let repo = Repository::open_in_memory().await.unwrap();

        assert_eq!(
            repo.subscribe(7).await.unwrap(),
            SubscribeOutcome::NoStationSelected
        );
        assert!(repo.get_subscriber(7).await.unwrap().is_none());

        repo.select_station(7, "station05").await.unwrap();
        assert_eq!(repo.subscribe(7).await.unwrap(), SubscribeOutcome::Subscribed);
        assert_eq!(
            repo.subscribe(7).await.unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );

        let sub = repo.get_subscriber(7).await.unwrap().unwrap();
        assert!(sub.subscribed);
        assert_eq!(sub.selected_station.as_deref(), Some("station05"));
        assert_eq!(sub.status_filter, StatusFilter::All);
    }

    #[tokio::test]
    async fn filter_change_needs_subscription() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.select_station(9, "station01").await.unwrap();

        assert!(!repo.set_filter(9, StatusFilter::RedOnly).await.unwrap());
        let sub = repo.get_subscriber(9).await.unwrap().unwrap();
        assert_eq!(sub.status_filter, StatusFilter::All);

        repo.subscribe(9).await.unwrap();
        assert!(repo.set_filter(9, StatusFilter::RedOnly).await.unwrap());
        let sub = repo.get_subscriber(9).await.unwrap().unwrap();
        assert_eq!(sub.status_filter, StatusFilter::RedOnly);
    }

    #[tokio::test]
    async fn unsubscribe_removes_row() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.select_station(3, "station02").await.unwrap();
        assert!(!repo.unsubscribe(3).await.unwrap());

        repo.subscribe(3).await.unwrap();
        assert_eq!(repo.active_subscribers().await.unwrap().len(), 1);

        assert!(repo.unsubscribe(3).await.unwrap());
        assert!(repo.get_subscriber(3).await.unwrap().is_none());
        assert!(repo.active_subscribers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reselecting_moves_active_subscription() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.select_station(4, "station01").await.unwrap();
        repo.subscribe(4).await.unwrap();
        repo.set_filter(4, StatusFilter::OrangeAndAbove).await.unwrap();

        repo.select_station(4, "station08").await.unwrap();
        let sub = repo.get_subscriber(4).await.unwrap().unwrap();
        assert!(sub.subscribed);
        assert_eq!(sub.selected_station.as_deref(), Some("station08"));
        assert_eq!(sub.status_filter, StatusFilter::OrangeAndAbove);
    }
}
