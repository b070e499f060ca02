//! Pollutant threshold classification and the health advice shown to subscribers.

use std::collections::BTreeMap;

use crate::models::{Pollutant, Reading, Severity, UNIT};

/// PM₁₀ above this warrants the dust-storm note.
const DUST_NOTE_PM10: f64 = 100.0;
const DUST_NOTE: &str = "🌍 Note: Cyprus experiences African/Middle Eastern dust ~50 days/year";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Moderate,
    High,
    VeryHigh,
}

impl Level {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very high",
        }
    }

    fn is_high_tier(&self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flagged {
    pub pollutant: Pollutant,
    pub value: f64,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Severity,
    /// High tier first, then moderate; source order within a tier.
    pub flagged: Vec<Flagged>,
    pub message: Option<String>,
}

impl Classification {
    pub fn top(&self) -> Option<&Flagged> {
        self.flagged.first()
    }
}

/// Extracts the number from a value like `69.6 µg/m³` or `12,5`.
pub fn parse_value(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    token
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn level_for(pollutant: Pollutant, value: f64) -> Option<Level> {
    let t = pollutant.thresholds()?;
    if value > t.high {
        Some(Level::VeryHigh)
    } else if value > t.moderate {
        Some(Level::High)
    } else if value > t.low {
        Some(Level::Moderate)
    } else {
        None
    }
}

pub fn classify(reading: &Reading) -> Classification {
    classify_values(reading.status, &reading.pollutants)
}

pub fn classify_values(status: Severity, values: &BTreeMap<Pollutant, String>) -> Classification {
    let mut high = Vec::new();
    let mut moderate = Vec::new();

    for pollutant in Pollutant::CLASSIFIED {
        let Some(value) = values.get(&pollutant).and_then(|raw| parse_value(raw)) else {
            continue;
        };
        if let Some(level) = level_for(pollutant, value) {
            let flagged = Flagged {
                pollutant,
                value,
                level,
            };
            if level.is_high_tier() {
                high.push(flagged);
            } else {
                moderate.push(flagged);
            }
        }
    }

    let message = compose_message(status, &high, &moderate);
    high.extend(moderate);

    Classification {
        status,
        flagged: high,
        message,
    }
}

fn names(flagged: &[Flagged], limit: usize) -> String {
    flagged
        .iter()
        .take(limit)
        .map(|f| f.pollutant.descriptive_name())
        .collect::<Vec<_>>()
        .join(" and ")
}

fn headline(status: Severity, high: &[Flagged], moderate: &[Flagged]) -> Vec<String> {
    let (first, second) = match status {
        Severity::Red if !high.is_empty() => (
            format!(
                "❗ Warning! Severe air pollution: very high levels of {}.",
                names(high, 2)
            ),
            "Avoid outdoor activities. Keep windows closed.",
        ),
        Severity::Red => (
            "❗ Warning! Poor air quality detected!".to_string(),
            "Avoid going outdoors, especially if you're sensitive.",
        ),
        Severity::Orange if !high.is_empty() => (
            format!("❗ Warning! High levels of {}!", names(high, 2)),
            "Sensitive groups should reduce outdoor activity.",
        ),
        Severity::Orange if !moderate.is_empty() => (
            format!("❗ Warning! Elevated {} levels.", names(moderate, 1)),
            "Consider limiting extended time outdoors.",
        ),
        Severity::Orange => (
            "❗ Warning! Moderate to high air pollution.".to_string(),
            "Some individuals may feel effects during outdoor activity.",
        ),
        Severity::Yellow if !moderate.is_empty() => (
            format!("Attention: moderate levels of {}.", names(moderate, 2)),
            "Air quality acceptable for most people.",
        ),
        Severity::Yellow => (
            "Moderate air quality.".to_string(),
            "Sensitive individuals may want to limit outdoor time.",
        ),
        Severity::Green => (
            "Good air quality!".to_string(),
            "Safe for all outdoor activities.",
        ),
        Severity::White | Severity::Unknown => return Vec::new(),
    };
    vec![first, second.to_string()]
}

fn compose_message(status: Severity, high: &[Flagged], moderate: &[Flagged]) -> Option<String> {
    let mut lines = headline(status, high, moderate);

    let dominant = if high.is_empty() { moderate } else { high };
    if let Some(top) = dominant.first() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("⚠️ Elevated pollutants:".to_string());
        for f in high.iter().chain(moderate).take(3) {
            lines.push(format!(
                "• {}: {:.1} {} ({})",
                f.pollutant.descriptive_name(),
                f.value,
                UNIT,
                f.level.label()
            ));
            lines.push(format!("  {}", f.pollutant.health_impact()));
        }

        lines.push(String::new());
        lines.push(top.pollutant.sources_line().to_string());
        if top.pollutant == Pollutant::Pm10 && top.value > DUST_NOTE_PM10 {
            lines.push(DUST_NOTE.to_string());
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(Pollutant, &str)]) -> BTreeMap<Pollutant, String> {
        pairs.iter().map(|(p, v)| (*p, v.to_string())).collect()
    }

    #[test]
    fn parse_value_handles_units_and_commas() {
        assert_eq!(parse_value("69.6 µg/m³"), Some(69.6));
        assert_eq!(parse_value("12,5"), Some(12.5));
        assert_eq!(parse_value("12,5 µg/m³"), Some(12.5));
        assert_eq!(parse_value("  230.5\u{a0}µg/m³"), Some(230.5));
        assert_eq!(parse_value("7"), Some(7.0));
    }

    #[test]
    fn parse_value_rejects_absent_and_garbage() {
        assert_eq!(parse_value("None"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("   "), None);
        assert_eq!(parse_value("n/a µg/m³"), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
    }

    #[test]
    fn boundaries_are_strict() {
        assert_eq!(level_for(Pollutant::Pm10, 50.0), None);
        assert_eq!(level_for(Pollutant::Pm10, 50.1), Some(Level::Moderate));
        assert_eq!(level_for(Pollutant::Pm10, 100.0), Some(Level::Moderate));
        assert_eq!(level_for(Pollutant::Pm10, 100.1), Some(Level::High));
        assert_eq!(level_for(Pollutant::Pm10, 200.0), Some(Level::High));
        assert_eq!(level_for(Pollutant::Pm10, 200.1), Some(Level::VeryHigh));
        assert_eq!(level_for(Pollutant::Co, 30000.5), Some(Level::VeryHigh));
        assert_eq!(level_for(Pollutant::Nox, 9999.0), None);
    }

    #[test]
    fn red_pm10_dust_event() {
        let c = classify_values(
            Severity::Red,
            &values(&[
                (Pollutant::Pm10, "230.5 µg/m³"),
                (Pollutant::Pm2_5, "60"),
                (Pollutant::O3, "None"),
            ]),
        );

        assert_eq!(c.flagged.len(), 2);
        assert_eq!(c.flagged[0].pollutant, Pollutant::Pm10);
        assert_eq!(c.flagged[0].level, Level::VeryHigh);
        assert_eq!(c.flagged[1].pollutant, Pollutant::Pm2_5);
        assert_eq!(c.flagged[1].level, Level::High);

        let message = c.message.unwrap();
        let headline = message.lines().next().unwrap();
        assert!(headline.contains("PM₁₀ (coarse particles)"));
        assert!(headline.contains("PM₂.₅ (fine particles)"));
        assert!(message.contains("• PM₁₀ (coarse particles): 230.5 µg/m³ (very high)"));
        assert!(message.contains("• PM₂.₅ (fine particles): 60.0 µg/m³ (high)"));
        assert!(message.contains("Saharan/Middle Eastern dust storms"));
        assert!(message.contains(DUST_NOTE));
    }

    #[test]
    fn high_tier_precedes_moderate_regardless_of_source_order() {
        let c = classify_values(
            Severity::Orange,
            &values(&[
                (Pollutant::Pm10, "60"),
                (Pollutant::O3, "150"),
                (Pollutant::Co, "35000"),
            ]),
        );
        let order: Vec<_> = c.flagged.iter().map(|f| f.pollutant).collect();
        assert_eq!(order, vec![Pollutant::O3, Pollutant::Co, Pollutant::Pm10]);

        let message = c.message.unwrap();
        assert!(message.starts_with("❗ Warning! High levels of Ozone (O₃) and Carbon monoxide (CO)!"));
        assert!(message.contains("☀️ Formation:"));
    }

    #[test]
    fn bullet_list_stops_at_three() {
        let c = classify_values(
            Severity::Red,
            &values(&[
                (Pollutant::Pm10, "250"),
                (Pollutant::Pm2_5, "120"),
                (Pollutant::O3, "200"),
                (Pollutant::No2, "450"),
            ]),
        );
        assert_eq!(c.flagged.len(), 4);
        let message = c.message.unwrap();
        assert_eq!(message.matches("• ").count(), 3);
        assert!(!message.contains("• Nitrogen dioxide"));
    }

    #[test]
    fn dust_note_needs_pm10_above_100() {
        let c = classify_values(Severity::Yellow, &values(&[(Pollutant::Pm10, "80")]));
        let message = c.message.unwrap();
        assert!(message.starts_with("Attention: moderate levels of PM₁₀ (coarse particles)."));
        assert!(message.contains("💨 Common sources:"));
        assert!(!message.contains(DUST_NOTE));
    }

    #[test]
    fn green_without_flags_is_brief_and_present() {
        let c = classify_values(Severity::Green, &values(&[(Pollutant::Pm10, "12.0")]));
        assert!(c.flagged.is_empty());
        assert_eq!(
            c.message.as_deref(),
            Some("Good air quality!\nSafe for all outdoor activities.")
        );
    }

    #[test]
    fn off_scale_status_without_flags_has_no_message() {
        let clean = values(&[(Pollutant::Pm10, "12.0")]);
        assert_eq!(classify_values(Severity::White, &clean).message, None);
        assert_eq!(classify_values(Severity::Unknown, &clean).message, None);
    }

    #[test]
    fn off_scale_status_still_lists_flags() {
        let c = classify_values(Severity::Unknown, &values(&[(Pollutant::So2, "400")]));
        let message = c.message.unwrap();
        assert!(message.starts_with("⚠️ Elevated pollutants:"));
        assert!(message.contains("🏭 Common sources:"));
    }

    #[test]
    fn classification_is_deterministic() {
        let v = values(&[(Pollutant::Pm10, "150"), (Pollutant::No2, "120")]);
        assert_eq!(
            classify_values(Severity::Orange, &v),
            classify_values(Severity::Orange, &v)
        );
    }
}
