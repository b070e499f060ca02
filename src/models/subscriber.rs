use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Severity, Station};

/// Which statuses a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    YellowAndAbove,
    OrangeAndAbove,
    RedOnly,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::YellowAndAbove,
        StatusFilter::OrangeAndAbove,
        StatusFilter::RedOnly,
    ];

    /// White and Unknown only ever pass the `All` filter.
    pub fn matches(&self, severity: Severity) -> bool {
        let floor = match self {
            Self::All => return true,
            Self::YellowAndAbove => Severity::Yellow,
            Self::OrangeAndAbove => Severity::Orange,
            Self::RedOnly => Severity::Red,
        };
        match (severity.rank(), floor.rank()) {
            (Some(rank), Some(floor)) => rank >= floor,
            _ => false,
        }
    }

    /// Stored and callback token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::YellowAndAbove => "yellow_up",
            Self::OrangeAndAbove => "orange_up",
            Self::RedOnly => "red_only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "yellow_up" | "yellow" => Some(Self::YellowAndAbove),
            "orange_up" | "orange" => Some(Self::OrangeAndAbove),
            "red_only" | "red" => Some(Self::RedOnly),
            _ => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::All => "All statuses",
            Self::YellowAndAbove => "🟡 Yellow and above",
            Self::OrangeAndAbove => "🟠 Orange and above",
            Self::RedOnly => "🔴 Red only",
        }
    }

    pub const fn confirmation(&self) -> &'static str {
        match self {
            Self::All => "You will receive notifications for all statuses.",
            Self::YellowAndAbove => {
                "You will receive notifications for 🟡 Yellow, 🟠 Orange, and 🔴 Red statuses only."
            }
            Self::OrangeAndAbove => {
                "You will receive notifications for 🟠 Orange and 🔴 Red statuses only."
            }
            Self::RedOnly => "You will receive notifications for 🔴 Red status only.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub recipient_id: i64,
    pub selected_station: Option<String>,
    pub subscribed: bool,
    pub status_filter: StatusFilter,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn station(&self) -> Option<&'static Station> {
        self.selected_station.as_deref().and_then(Station::by_id)
    }
}
