use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use common::{ReservationId, RestaurantId, TableId};

/// Errors that can occur when interacting with reservation storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The reservation was updated by someone else since it was loaded.
    #[error(
        "Version conflict for reservation {reservation_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        reservation_id: ReservationId,
        expected: i64,
        actual: i64,
    },

    /// A competing booking took the table between validation and the write.
    #[error("Table is already reserved from {start} to {end}")]
    TableConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A competing booking for the same user landed between validation and
    /// the write.
    #[error("User already has a reservation from {start} to {end} in another restaurant")]
    UserConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The reservation was not found.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// The notification was not found (or belongs to a different user).
    #[error("Notification not found: {0}")]
    NotificationNotFound(Uuid),

    /// The restaurant was not found in the directory.
    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(RestaurantId),

    /// The table was not found in the directory.
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
