mod pollutant;
mod reading;
mod severity;
mod station;
mod subscriber;

pub use pollutant::{Pollutant, Thresholds, UNIT};
pub use reading::{NewReading, ObservedAt, Reading};
pub use severity::Severity;
pub use station::{Station, STATIONS};
pub use subscriber::{StatusFilter, Subscriber};
