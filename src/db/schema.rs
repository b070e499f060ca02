pub const SCHEMA: &str = r#"
-- readings table (append-only)
CREATE TABLE IF NOT EXISTS readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    station_id TEXT NOT NULL,
    status TEXT NOT NULL,
    pm_10 TEXT,
    pm_2_5 TEXT,
    o3 TEXT,
    no TEXT,
    no2 TEXT,
    nox TEXT,
    so2 TEXT,
    co TEXT,
    c6h6 TEXT,
    observed_at TEXT NOT NULL,
    observed_key TEXT NOT NULL,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(station_id, observed_key)
);

CREATE INDEX IF NOT EXISTS idx_readings_station_id ON readings(station_id, id DESC);

-- subscribers table
CREATE TABLE IF NOT EXISTS subscribers (
    recipient_id INTEGER PRIMARY KEY,
    selected_station TEXT,
    subscribed INTEGER NOT NULL DEFAULT 0,
    status_filter TEXT NOT NULL DEFAULT 'all',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_subscribers_station ON subscribers(selected_station, subscribed);
"#;
