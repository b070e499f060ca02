use serde::{Deserialize, Serialize};

/// Air-quality status tier as published by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Green,
    Yellow,
    Orange,
    Red,
    White,
    Unknown,
}

impl Severity {
    /// Maps a status class token such as `station-status-orange`.
    pub fn from_status_class(class: &str) -> Self {
        match class.trim() {
            "station-status-green" => Self::Green,
            "station-status-yellow" => Self::Yellow,
            "station-status-orange" => Self::Orange,
            "station-status-red" => Self::Red,
            "station-status-white" => Self::White,
            _ => Self::Unknown,
        }
    }

    /// Position on the Green < Yellow < Orange < Red scale. White and Unknown
    /// are off the scale.
    pub const fn rank(&self) -> Option<u8> {
        match self {
            Self::Green => Some(0),
            Self::Yellow => Some(1),
            Self::Orange => Some(2),
            Self::Red => Some(3),
            Self::White | Self::Unknown => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::White => "white",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "orange" => Self::Orange,
            "red" => Self::Red,
            "white" => Self::White,
            _ => Self::Unknown,
        }
    }

    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Green => "🟢",
            Self::Yellow => "🟡",
            Self::Orange => "🟠",
            Self::Red => "🔴",
            Self::White => "⚪",
            Self::Unknown => "❓",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
