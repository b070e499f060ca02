use async_trait::async_trait;

use crate::error::DeliveryError;

/// Outbound channel to a recipient.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, recipient_id: i64, text: &str) -> Result<(), DeliveryError>;
}

/// Stand-in used when no transport is configured: deliveries go to the log.
pub struct LogDeliverer;

#[async_trait]
impl Deliverer for LogDeliverer {
    async fn deliver(&self, recipient_id: i64, text: &str) -> Result<(), DeliveryError> {
        tracing::info!(
            "No transport configured; would deliver {} chars to {}",
            text.chars().count(),
            recipient_id
        );
        Ok(())
    }
}
