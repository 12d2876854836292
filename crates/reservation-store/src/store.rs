use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use common::{ReservationId, RestaurantId, TableId, UserId};
use domain::{HistoryEntry, Reservation, ReservationState, RestaurantInfo, TableInfo};

use crate::{Notification, ReservationQuery, Result};

/// Core trait for reservation storage implementations.
///
/// All implementations must be thread-safe (Send + Sync). Writes use
/// optimistic concurrency: `update` succeeds only when the stored version
/// matches the version the caller loaded, and `insert` re-checks booking
/// conflicts under the write lock so two racing requests cannot both land
/// on the same slot.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts a new reservation.
    ///
    /// Conflicts against already-persisted reservations (same table, or the
    /// same user at another restaurant) are re-checked atomically with the
    /// write; `now` determines which existing reservations still block.
    async fn insert(&self, reservation: &Reservation, now: DateTime<Utc>) -> Result<()>;

    /// Persists an updated reservation.
    ///
    /// The stored row must still be at `reservation.version()`; on success
    /// the stored version is incremented and the new version returned.
    async fn update(&self, reservation: &Reservation) -> Result<i64>;

    /// Retrieves a reservation by id.
    async fn get(&self, id: ReservationId) -> Result<Reservation>;

    /// Retrieves reservations matching a query, ordered by date then time.
    async fn query(&self, query: ReservationQuery) -> Result<Vec<Reservation>>;

    /// All reservations booked on the given table for any of the given dates.
    async fn for_table_on_dates(
        &self,
        table_id: TableId,
        dates: &[NaiveDate],
    ) -> Result<Vec<Reservation>>;

    /// All reservations held by the user on any of the given dates at
    /// restaurants other than the given one.
    async fn for_user_on_dates_excluding(
        &self,
        user_id: UserId,
        dates: &[NaiveDate],
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Reservation>>;

    /// Reservations in the given state whose window ended at or before `now`,
    /// ordered by end time. Feed for the auto-advance scheduler.
    async fn due_for_auto_advance(
        &self,
        state: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>>;

    /// Appends an audit record.
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()>;

    /// Retrieves the audit trail for a reservation, oldest first.
    async fn history_for(&self, reservation_id: ReservationId) -> Result<Vec<HistoryEntry>>;
}

/// Storage for in-app notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists a notification.
    async fn add(&self, notification: &Notification) -> Result<()>;

    /// Retrieves a user's notifications, newest first. With `unread_only`
    /// set, read notifications are skipped.
    async fn for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<Notification>>;

    /// Marks a notification as read, stamping `read_at` the first time only.
    ///
    /// Fails with `NotificationNotFound` when the id does not exist or the
    /// notification belongs to a different user.
    async fn mark_read(
        &self,
        id: Uuid,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Notification>;
}

/// Read-only lookup of restaurants and tables.
///
/// Restaurant and table management lives outside the booking core; this is
/// the narrow view the validator needs.
#[async_trait]
pub trait RestaurantDirectory: Send + Sync {
    /// Retrieves a restaurant snapshot.
    async fn restaurant(&self, id: RestaurantId) -> Result<RestaurantInfo>;

    /// Retrieves a table snapshot.
    async fn table(&self, id: TableId) -> Result<TableInfo>;
}
