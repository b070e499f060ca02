use crate::db::{Repository, SubscribeOutcome};
use crate::error::{PreconditionError, Result};
use crate::models::{Station, StatusFilter, Subscriber};

/// What `get_status` reports back for a recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionStatus {
    pub station: Option<&'static Station>,
    pub subscribed: bool,
    pub filter: StatusFilter,
}

impl From<Option<Subscriber>> for SubscriptionStatus {
    fn from(subscriber: Option<Subscriber>) -> Self {
        match subscriber {
            Some(sub) => Self {
                station: sub.station(),
                subscribed: sub.subscribed,
                filter: sub.status_filter,
            },
            None => Self {
                station: None,
                subscribed: false,
                filter: StatusFilter::default(),
            },
        }
    }
}

/// Subscription commands over the subscriber store. Out-of-order calls come
/// back as `PreconditionError` with the store left untouched.
#[derive(Clone)]
pub struct Subscriptions {
    repository: Repository,
}

impl Subscriptions {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn select(&self, recipient_id: i64, station_id: &str) -> Result<&'static Station> {
        let station = Station::by_id(station_id)
            .ok_or_else(|| PreconditionError::UnknownStation(station_id.to_string()))?;
        self.repository.select_station(recipient_id, station.id).await?;
        tracing::info!("{} selected {}", recipient_id, station.display_name);
        Ok(station)
    }

    /// Returns `false` when the recipient was already subscribed.
    pub async fn subscribe(&self, recipient_id: i64) -> Result<bool> {
        match self.repository.subscribe(recipient_id).await? {
            SubscribeOutcome::Subscribed => {
                tracing::info!("{} subscribed", recipient_id);
                Ok(true)
            }
            SubscribeOutcome::AlreadySubscribed => Ok(false),
            SubscribeOutcome::NoStationSelected => Err(PreconditionError::NoStationSelected.into()),
        }
    }

    pub async fn unsubscribe(&self, recipient_id: i64) -> Result<()> {
        if !self.repository.unsubscribe(recipient_id).await? {
            return Err(PreconditionError::NotSubscribed.into());
        }
        tracing::info!("{} unsubscribed", recipient_id);
        Ok(())
    }

    pub async fn set_filter(&self, recipient_id: i64, filter: StatusFilter) -> Result<()> {
        if !self.repository.set_filter(recipient_id, filter).await? {
            return Err(PreconditionError::NotSubscribed.into());
        }
        tracing::info!("{} set filter {}", recipient_id, filter.as_str());
        Ok(())
    }

    pub async fn get_status(&self, recipient_id: i64) -> Result<SubscriptionStatus> {
        Ok(self.repository.get_subscriber(recipient_id).await?.into())
    }
}
