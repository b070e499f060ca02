pub mod classifier;
mod delivery;
mod notifier;
mod subscriptions;
pub mod telegram;

pub use classifier::{classify, Classification, Flagged, Level};
pub use delivery::{Deliverer, LogDeliverer};
pub use notifier::{format_bulletin, station_bulletin, Bulletin, NotifyReport, Notifier};
pub use subscriptions::{SubscriptionStatus, Subscriptions};
pub use telegram::{ReplyMarkup, TelegramClient, Update};
