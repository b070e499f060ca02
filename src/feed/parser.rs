//! Extraction of per-station readings from the network's overview page.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::models::{NewReading, ObservedAt, Pollutant, Severity, Station};

pub const CONTAINER_ID: &str = "views-bootstrap-frontpage-stations-overview-block-1";

const MAINTENANCE_SEL: &str = "span.under-maintenance-label";
const TITLE_SEL: &str = "h4.stations-overview-title";
const STATUS_SEL: &str = "span.group-status-helper-wrapper span";
const LABEL_SEL: &str = "span.pollutant-label";
const VALUE_SEL: &str = "span.pollutant-value";
const UPDATE_TIME_SEL: &str = "div.views-field-field-station-update-time";

/// What one station block on the page amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum StationBlock {
    Reading(NewReading),
    Maintenance { index: usize },
    Unmapped { index: usize, name: String },
}

pub type BlockResult = std::result::Result<StationBlock, ParseError>;

/// Parses the overview page. A missing container fails the whole page; a
/// broken station block only fails its own entry.
pub fn parse_page(html: &str) -> std::result::Result<Vec<BlockResult>, ParseError> {
    let document = Html::parse_document(html);
    let container_sel = selector(&format!("div#{CONTAINER_ID}"))?;
    let div_sel = selector("div")?;

    let container = document
        .select(&container_sel)
        .next()
        .ok_or_else(|| ParseError::MissingContainer(CONTAINER_ID.to_string()))?;

    let blocks = container
        .select(&div_sel)
        .filter(|div| div.value().classes().any(|c| c.starts_with("col")))
        .enumerate()
        .map(|(i, div)| parse_block(i + 1, div))
        .collect();

    Ok(blocks)
}

fn parse_block(index: usize, block: ElementRef<'_>) -> BlockResult {
    if block.select(&selector(MAINTENANCE_SEL)?).next().is_some() {
        return Ok(StationBlock::Maintenance { index });
    }

    let name = block
        .select(&selector(TITLE_SEL)?)
        .next()
        .map(text_of)
        .filter(|name| !name.is_empty())
        .ok_or(ParseError::MissingField {
            index,
            field: "station name",
        })?;

    let Some(station) = Station::from_source_name(&name) else {
        return Ok(StationBlock::Unmapped { index, name });
    };

    let status = block
        .select(&selector(STATUS_SEL)?)
        .next()
        .and_then(|span| {
            span.value()
                .classes()
                .find(|c| c.starts_with("station-status-"))
                .map(Severity::from_status_class)
        })
        .unwrap_or(Severity::Unknown);

    let label_sel = selector(LABEL_SEL)?;
    let value_sel = selector(VALUE_SEL)?;
    let mut pollutants = BTreeMap::new();
    for (label, value) in block.select(&label_sel).zip(block.select(&value_sel)) {
        let label = text_of(label);
        match Pollutant::from_label(&label) {
            Some(pollutant) => {
                pollutants.insert(pollutant, text_of(value));
            }
            None => tracing::debug!("{}: ignoring unknown pollutant label '{}'", name, label),
        }
    }

    let observed_at = block
        .select(&selector(UPDATE_TIME_SEL)?)
        .next()
        .map(|div| ObservedAt::parse(&text_of(div)))
        .filter(|observed| !observed.raw.is_empty())
        .ok_or(ParseError::MissingField {
            index,
            field: "update time",
        })?;

    Ok(StationBlock::Reading(NewReading {
        station_id: station.id.to_string(),
        status,
        pollutants,
        observed_at,
    }))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn selector(s: &str) -> std::result::Result<Selector, ParseError> {
    Selector::parse(s).map_err(|e| ParseError::Selector {
        selector: s.to_string(),
        message: format!("{e:?}"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn station_html(name: &str, status: &str, pm10: &str, updated: &str) -> String {
        format!(
            r#"<div class="col-md-4 views-row">
                <h4 class="stations-overview-title">{name}</h4>
                <span class="group-status-helper-wrapper"><span class="station-status-{status} status-dot"></span></span>
                <span class="pollutant-label">PM₁₀:</span><span class="pollutant-value">{pm10}</span>
                <span class="pollutant-label">PM₂.₅:</span><span class="pollutant-value">18.2 µg/m³</span>
                <span class="pollutant-label">O₃:</span><span class="pollutant-value">None</span>
                <span class="pollutant-label">NO₂:</span><span class="pollutant-value">21,4 µg/m³</span>
                <div class="views-field-field-station-update-time">Updated on: {updated}</div>
            </div>"#
        )
    }

    pub(crate) fn page(blocks: &[String]) -> String {
        format!(
            r#"<html><body><div id="{CONTAINER_ID}" class="view">{}</div></body></html>"#,
            blocks.join("\n")
        )
    }

    fn readings(blocks: Vec<BlockResult>) -> Vec<NewReading> {
        blocks
            .into_iter()
            .filter_map(|b| match b {
                Ok(StationBlock::Reading(r)) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn extracts_station_reading() {
        let html = page(&[station_html(
            "Limassol - Traffic Station",
            "orange",
            "120.3 µg/m³",
            "24/05/2025 17:00",
        )]);

        let blocks = parse_page(&html).unwrap();
        let readings = readings(blocks);
        assert_eq!(readings.len(), 1);

        let r = &readings[0];
        assert_eq!(r.station_id, "station03");
        assert_eq!(r.status, Severity::Orange);
        assert_eq!(r.pollutants[&Pollutant::Pm10], "120.3 µg/m³");
        assert_eq!(r.pollutants[&Pollutant::No2], "21,4 µg/m³");
        assert_eq!(r.pollutants[&Pollutant::O3], "None");
        assert!(!r.pollutants.contains_key(&Pollutant::So2));
        assert_eq!(r.observed_at.raw, "24/05/2025 17:00");
        assert_eq!(r.observed_at.key, "2025-05-24T17:00");
    }

    #[test]
    fn missing_container_fails_page() {
        let html = "<html><body><div id=\"something-else\"></div></body></html>";
        assert_eq!(
            parse_page(html),
            Err(ParseError::MissingContainer(CONTAINER_ID.to_string()))
        );
    }

    #[test]
    fn maintenance_and_unknown_stations_are_skipped() {
        let maintenance = r#"<div class="col-md-4">
                <h4 class="stations-overview-title">Zygi - Industrial Station</h4>
                <span class="under-maintenance-label">Under maintenance</span>
            </div>"#
            .to_string();
        let html = page(&[
            maintenance,
            station_html("Atlantis - Ocean Station", "green", "5", "24/05/2025 17:00"),
        ]);

        let blocks = parse_page(&html).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Ok(StationBlock::Maintenance { index: 1 }));
        assert_eq!(
            blocks[1],
            Ok(StationBlock::Unmapped {
                index: 2,
                name: "Atlantis - Ocean Station".to_string()
            })
        );
    }

    #[test]
    fn broken_block_does_not_affect_neighbours() {
        let broken = r#"<div class="col-md-4">
                <h4 class="stations-overview-title">Mari - Industrial Station</h4>
            </div>"#
            .to_string();
        let html = page(&[
            broken,
            station_html("Paphos - Traffic Station", "green", "22", "24/05/2025 17:00"),
        ]);

        let blocks = parse_page(&html).unwrap();
        assert_eq!(
            blocks[0],
            Err(ParseError::MissingField {
                index: 1,
                field: "update time"
            })
        );
        let readings = readings(blocks);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].station_id, "station05");
    }

    #[test]
    fn missing_status_is_unknown() {
        let block = r#"<div class="col-md-4">
                <h4 class="stations-overview-title">Ormidia Industrial Station</h4>
                <div class="views-field-field-station-update-time">Updated on: 01/06/2025 08:00</div>
            </div>"#
            .to_string();
        let readings = readings(parse_page(&page(&[block])).unwrap());
        assert_eq!(readings[0].status, Severity::Unknown);
        assert!(readings[0].pollutants.is_empty());
    }
}
