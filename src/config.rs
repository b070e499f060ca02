use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_SOURCE_URL: &str = "https://www.airquality.dli.mlsi.gov.cy/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_source_url")]
    pub source_url: String,

    pub telegram_token: Option<String>,

    /// Minute of the hour the scraper runs at. The source publishes by :19.
    #[serde(default = "default_scrape_minute")]
    pub scrape_minute: u32,

    #[serde(default = "default_notify_minute")]
    pub notify_minute: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cydust");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("cydust.db").to_string_lossy().to_string()
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_scrape_minute() -> u32 {
    20
}

fn default_notify_minute() -> u32 {
    25
}

fn default_request_timeout() -> u64 {
    30
}

fn default_delivery_timeout() -> u64 {
    15
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            source_url: default_source_url(),
            telegram_token: None,
            scrape_minute: default_scrape_minute(),
            notify_minute: default_notify_minute(),
            request_timeout_secs: default_request_timeout(),
            delivery_timeout_secs: default_delivery_timeout(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Ok(token) = std::env::var("TELEGRAM_TOKEN") {
            if !token.trim().is_empty() {
                config.telegram_token = Some(token.trim().to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cydust")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        for (name, minute) in [
            ("scrape_minute", self.scrape_minute),
            ("notify_minute", self.notify_minute),
        ] {
            if minute >= 60 {
                return Err(AppError::Config(format!(
                    "{name} must be below 60, got {minute}"
                )));
            }
        }
        if self.request_timeout_secs == 0 || self.delivery_timeout_secs == 0 {
            return Err(AppError::Config("timeouts must be non-zero".to_string()));
        }
        url::Url::parse(&self.source_url)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}
