use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;

/// Where the station listing HTML comes from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self) -> Result<String>;
}

pub struct SourceFetcher {
    client: Client,
    url: String,
}

impl SourceFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("cydust/1.0")
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PageSource for SourceFetcher {
    async fn fetch_page(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch {}: HTTP {}", self.url, response.status()).into());
        }

        Ok(response.text().await?)
    }
}
