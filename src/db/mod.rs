pub mod subscriptions;
pub mod users;

use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Failed to execute a database query.")]
    Database(#[from] sqlx::Error),
    #[error("Stored record {id} is invalid: {reason}")]
    InvalidRecord { id: Uuid, reason: String },
    #[error("Subscription {0} was not updated: it is missing or was notified more recently.")]
    NotUpdated(Uuid),
}
