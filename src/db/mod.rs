mod repository;
mod schema;

pub use repository::{InsertOutcome, Repository, SubscribeOutcome};
