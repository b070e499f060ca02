use serde::{Deserialize, Serialize};

pub const UNIT: &str = "µg/m³";

/// Pollutants reported per station, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Pm10,
    Pm2_5,
    O3,
    No,
    No2,
    Nox,
    So2,
    Co,
    C6h6,
}

/// Three-tier limit table for one pollutant, in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl Pollutant {
    pub const ALL: [Pollutant; 9] = [
        Pollutant::Pm10,
        Pollutant::Pm2_5,
        Pollutant::O3,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::Nox,
        Pollutant::So2,
        Pollutant::Co,
        Pollutant::C6h6,
    ];

    /// Pollutants with health thresholds, in classification order.
    pub const CLASSIFIED: [Pollutant; 6] = [
        Pollutant::Pm10,
        Pollutant::Pm2_5,
        Pollutant::O3,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Co,
    ];

    pub const fn column(&self) -> &'static str {
        match self {
            Self::Pm10 => "pm_10",
            Self::Pm2_5 => "pm_2_5",
            Self::O3 => "o3",
            Self::No => "no",
            Self::No2 => "no2",
            Self::Nox => "nox",
            Self::So2 => "so2",
            Self::Co => "co",
            Self::C6h6 => "c6h6",
        }
    }

    /// Label as printed on the source page and in bulletins.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pm10 => "PM₁₀",
            Self::Pm2_5 => "PM₂.₅",
            Self::O3 => "O₃",
            Self::No => "NO",
            Self::No2 => "NO₂",
            Self::Nox => "NOx",
            Self::So2 => "SO₂",
            Self::Co => "CO",
            Self::C6h6 => "C₆H₆",
        }
    }

    /// Resolves a source label; a trailing colon is ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_end_matches(':').trim();
        Self::ALL.into_iter().find(|p| p.label() == label)
    }

    pub const fn thresholds(&self) -> Option<Thresholds> {
        let (low, moderate, high) = match self {
            Self::Pm10 => (50.0, 100.0, 200.0),
            Self::Pm2_5 => (25.0, 50.0, 100.0),
            Self::O3 => (100.0, 140.0, 180.0),
            Self::No2 => (100.0, 200.0, 400.0),
            Self::So2 => (125.0, 350.0, 500.0),
            Self::Co => (10000.0, 20000.0, 30000.0),
            Self::No | Self::Nox | Self::C6h6 => return None,
        };
        Some(Thresholds {
            low,
            moderate,
            high,
        })
    }

    pub const fn descriptive_name(&self) -> &'static str {
        match self {
            Self::Pm10 => "PM₁₀ (coarse particles)",
            Self::Pm2_5 => "PM₂.₅ (fine particles)",
            Self::O3 => "Ozone (O₃)",
            Self::No => "Nitric oxide (NO)",
            Self::No2 => "Nitrogen dioxide (NO₂)",
            Self::Nox => "Nitrogen oxides (NOx)",
            Self::So2 => "Sulfur dioxide (SO₂)",
            Self::Co => "Carbon monoxide (CO)",
            Self::C6h6 => "Benzene (C₆H₆)",
        }
    }

    pub const fn health_impact(&self) -> &'static str {
        match self {
            Self::Pm10 => "Irritates airways, worsens asthma, aggravates heart/lung disease",
            Self::Pm2_5 => {
                "Penetrates lungs/bloodstream causing cardiovascular disease, stroke, lung cancer"
            }
            Self::O3 => {
                "Inflames airways, triggers asthma, reduces lung function, causes chronic bronchitis"
            }
            Self::No2 | Self::No | Self::Nox => {
                "Aggravates asthma, reduces lung function, increases respiratory infections"
            }
            Self::So2 => {
                "Causes wheezing, chest tightness, shortness of breath, worsens heart disease"
            }
            Self::Co => {
                "Reduces oxygen to organs (heart/brain), causes headaches, dizziness, fatigue"
            }
            Self::C6h6 => "Carcinogenic with long-term exposure",
        }
    }

    /// Closing line naming where this pollutant usually comes from.
    pub const fn sources_line(&self) -> &'static str {
        match self {
            Self::Pm10 => "💨 Common sources: Saharan/Middle Eastern dust storms (~50 days/year), local traffic, construction",
            Self::Pm2_5 => "💨 Common sources: Vehicle exhaust, power generation, industrial facilities, regional transport",
            Self::O3 => "☀️ Formation: Forms from traffic NOx + heat/sunlight (Eastern Mediterranean climate factor)",
            Self::No2 | Self::No | Self::Nox => "🚗 Common sources: Urban traffic (2-4x higher in cities), diesel vehicles, ships, aviation",
            Self::So2 => "🏭 Common sources: Power generation, cement production, industrial facilities, ship emissions",
            Self::Co => "🚗 Common sources: Vehicle exhaust, incomplete combustion from traffic congestion",
            Self::C6h6 => "🚗 Common sources: Vehicle exhaust, fuel evaporation",
        }
    }
}

impl std::fmt::Display for Pollutant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_with_or_without_colon() {
        assert_eq!(Pollutant::from_label("PM₁₀:"), Some(Pollutant::Pm10));
        assert_eq!(Pollutant::from_label(" PM₂.₅ "), Some(Pollutant::Pm2_5));
        assert_eq!(Pollutant::from_label("C₆H₆"), Some(Pollutant::C6h6));
        assert_eq!(Pollutant::from_label("PM1"), None);
    }

    #[test]
    fn only_six_pollutants_are_classified() {
        let classified: Vec<_> = Pollutant::ALL
            .into_iter()
            .filter(|p| p.thresholds().is_some())
            .collect();
        assert_eq!(classified, Pollutant::CLASSIFIED.to_vec());
    }

    #[test]
    fn tiers_ascend() {
        for pollutant in Pollutant::CLASSIFIED {
            let t = pollutant.thresholds().unwrap();
            assert!(t.low < t.moderate && t.moderate < t.high, "{pollutant}");
        }
    }
}
