/// A monitoring station of the national air-quality network.
///
/// The source page and the chat keyboard spell station names differently
/// (`Nicosia - Traffic Station` vs `Nicosia: Traffic Station`); both spellings
/// live in this one table and resolve to the same `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Station {
    pub id: &'static str,
    pub display_name: &'static str,
    pub source_name: &'static str,
}

pub const STATIONS: [Station; 11] = [
    Station {
        id: "station01",
        display_name: "Nicosia: Traffic Station",
        source_name: "Nicosia - Traffic Station",
    },
    Station {
        id: "station02",
        display_name: "Nicosia: Residential Station",
        source_name: "Nicosia - Residential Station",
    },
    Station {
        id: "station03",
        display_name: "Limassol: Traffic Station",
        source_name: "Limassol - Traffic Station",
    },
    Station {
        id: "station04",
        display_name: "Larnaca: Traffic Station",
        source_name: "Larnaca - Traffic Station",
    },
    Station {
        id: "station05",
        display_name: "Paphos: Traffic Station",
        source_name: "Paphos - Traffic Station",
    },
    Station {
        id: "station06",
        display_name: "Ayia Marina Xyliatou: Background Station",
        source_name: "Ayia Marina Xyliatou - Background Station",
    },
    Station {
        id: "station07",
        display_name: "Zygi: Industrial Station",
        source_name: "Zygi - Industrial Station",
    },
    Station {
        id: "station08",
        display_name: "Mari: Industrial Station",
        source_name: "Mari - Industrial Station",
    },
    Station {
        id: "station09",
        display_name: "Paralimni: Traffic Station",
        source_name: "Paralimni - Traffic Station",
    },
    Station {
        id: "station10",
        display_name: "Kalavasos Industrial Station",
        source_name: "Kalavasos Industrial Station",
    },
    Station {
        id: "station11",
        display_name: "Ormidia Industrial Station",
        source_name: "Ormidia Industrial Station",
    },
];

impl Station {
    pub fn all() -> &'static [Station] {
        &STATIONS
    }

    pub fn by_id(id: &str) -> Option<&'static Station> {
        STATIONS.iter().find(|s| s.id == id)
    }

    pub fn from_source_name(name: &str) -> Option<&'static Station> {
        let name = name.trim();
        STATIONS.iter().find(|s| s.source_name == name)
    }

    pub fn from_display_name(name: &str) -> Option<&'static Station> {
        let name = name.trim();
        STATIONS.iter().find(|s| s.display_name == name)
    }

    /// Case-insensitive substring match against the display name, first hit wins.
    pub fn search(query: &str) -> Option<&'static Station> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        STATIONS
            .iter()
            .find(|s| s.display_name.to_lowercase().contains(&query))
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name)
    }
}
