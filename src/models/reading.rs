use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use super::{Pollutant, Severity};

const UPDATED_PREFIX: &str = "Updated on:";

static TIMESTAMP_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Observation time as reported by the source, plus the key used for dedup.
///
/// `raw` keeps the text shown on the page. `key` is `YYYY-MM-DDTHH:MM` when the
/// text contains a `DD/MM/YYYY HH:MM` timestamp, else the whitespace-normalized
/// text itself, so cosmetic changes on the page do not defeat dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedAt {
    pub raw: String,
    pub key: String,
}

impl ObservedAt {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let stripped = trimmed
            .strip_prefix(UPDATED_PREFIX)
            .unwrap_or(trimmed)
            .trim();
        let raw = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        let key = parse_timestamp_key(&raw).unwrap_or_else(|| raw.clone());
        Self { raw, key }
    }
}

fn parse_timestamp_key(text: &str) -> Option<String> {
    let re = TIMESTAMP_RE
        .get_or_init(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})\s+(\d{1,2}):(\d{2})").ok())
        .as_ref()?;
    let caps = re.captures(text)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
    let datetime = NaiveDate::from_ymd_opt(year, num(2)?, num(1)?)?.and_hms_opt(num(4)?, num(5)?, 0)?;
    Some(datetime.format("%Y-%m-%dT%H:%M").to_string())
}

/// One observation snapshot scraped for a station.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub station_id: String,
    pub status: Severity,
    pub pollutants: BTreeMap<Pollutant, String>,
    pub observed_at: ObservedAt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub station_id: String,
    pub status: Severity,
    pub pollutants: BTreeMap<Pollutant, String>,
    pub observed_at: String,
    pub fetched_at: DateTime<Utc>,
}

impl Reading {
    pub fn value(&self, pollutant: Pollutant) -> Option<&str> {
        self.pollutants.get(&pollutant).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_builds_iso_key() {
        let observed = ObservedAt::parse("  Updated on:  24/05/2025 17:00 ");
        assert_eq!(observed.raw, "24/05/2025 17:00");
        assert_eq!(observed.key, "2025-05-24T17:00");
    }

    #[test]
    fn format_drift_keeps_same_key() {
        let a = ObservedAt::parse("Updated on: 4/6/2025 09:00");
        let b = ObservedAt::parse("Updated on: 04/06/2025  09:00");
        assert_ne!(a.raw, b.raw);
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn unparseable_time_falls_back_to_text() {
        let observed = ObservedAt::parse("Updated on: yesterday   evening");
        assert_eq!(observed.raw, "yesterday evening");
        assert_eq!(observed.key, "yesterday evening");
    }

    #[test]
    fn impossible_dates_fall_back_to_text() {
        let observed = ObservedAt::parse("31/02/2025 10:00");
        assert_eq!(observed.key, "31/02/2025 10:00");
    }
}
