use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use common::{ReservationId, RestaurantId, TableId, UserId};
use domain::{
    HistoryEntry, Reservation, ReservationState, RestaurantInfo, TableInfo, intervals_overlap,
};

use crate::{
    Notification, ReservationQuery, Result, StoreError,
    store::{NotificationStore, ReservationStore, RestaurantDirectory},
};

/// In-memory storage implementation for testing and local development.
///
/// Stores everything behind tokio RwLocks and provides the same interface
/// and conflict semantics as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    reservations: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
    history: Arc<RwLock<Vec<HistoryEntry>>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
    restaurants: Arc<RwLock<HashMap<RestaurantId, RestaurantInfo>>>,
    tables: Arc<RwLock<HashMap<TableId, TableInfo>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a restaurant in the directory.
    pub async fn add_restaurant(&self, restaurant: RestaurantInfo) {
        self.restaurants
            .write()
            .await
            .insert(restaurant.id, restaurant);
    }

    /// Registers a table in the directory.
    pub async fn add_table(&self, table: TableInfo) {
        self.tables.write().await.insert(table.id, table);
    }

    /// Returns the total number of reservations stored.
    pub async fn reservation_count(&self) -> usize {
        self.reservations.read().await.len()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        self.reservations.write().await.clear();
        self.history.write().await.clear();
        self.notifications.write().await.clear();
        self.restaurants.write().await.clear();
        self.tables.write().await.clear();
    }
}

fn find_write_conflict(
    candidate: &Reservation,
    stored: &HashMap<ReservationId, Reservation>,
    now: DateTime<Utc>,
) -> Option<StoreError> {
    for existing in stored.values() {
        if existing.id() == candidate.id() || !existing.blocks_at(now) {
            continue;
        }
        let overlaps = intervals_overlap(
            candidate.start_time(),
            candidate.end_time(),
            existing.start_time(),
            existing.end_time(),
        );
        if !overlaps {
            continue;
        }
        if existing.table_id().is_some() && existing.table_id() == candidate.table_id() {
            return Some(StoreError::TableConflict {
                start: existing.start_time(),
                end: existing.end_time(),
            });
        }
        if existing.user_id() == candidate.user_id()
            && existing.restaurant_id() != candidate.restaurant_id()
        {
            return Some(StoreError::UserConflict {
                start: existing.start_time(),
                end: existing.end_time(),
            });
        }
    }
    None
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn insert(&self, reservation: &Reservation, now: DateTime<Utc>) -> Result<()> {
        let mut store = self.reservations.write().await;

        if let Some(existing) = store.get(&reservation.id()) {
            return Err(StoreError::VersionConflict {
                reservation_id: reservation.id(),
                expected: 0,
                actual: existing.version(),
            });
        }

        // Validation ran before taking the lock; a racing insert may have
        // landed since, so the conflict scan repeats here.
        if let Some(conflict) = find_write_conflict(reservation, &store, now) {
            return Err(conflict);
        }

        store.insert(reservation.id(), reservation.clone());
        Ok(())
    }

    async fn update(&self, reservation: &Reservation) -> Result<i64> {
        let mut store = self.reservations.write().await;

        let current = store
            .get(&reservation.id())
            .ok_or(StoreError::ReservationNotFound(reservation.id()))?;

        if current.version() != reservation.version() {
            return Err(StoreError::VersionConflict {
                reservation_id: reservation.id(),
                expected: reservation.version(),
                actual: current.version(),
            });
        }

        let new_version = reservation.version() + 1;
        let mut updated = reservation.clone();
        updated.set_version(new_version);
        store.insert(updated.id(), updated);
        Ok(new_version)
    }

    async fn get(&self, id: ReservationId) -> Result<Reservation> {
        let store = self.reservations.read().await;
        store
            .get(&id)
            .cloned()
            .ok_or(StoreError::ReservationNotFound(id))
    }

    async fn query(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        let store = self.reservations.read().await;
        let mut reservations: Vec<_> = store
            .values()
            .filter(|r| {
                if let Some(id) = query.restaurant_id
                    && r.restaurant_id() != id
                {
                    return false;
                }
                if let Some(id) = query.user_id
                    && r.user_id() != id
                {
                    return false;
                }
                if let Some(id) = query.table_id
                    && r.table_id() != Some(id)
                {
                    return false;
                }
                if let Some(state) = query.state
                    && r.state() != state
                {
                    return false;
                }
                if let Some(date) = query.date
                    && r.date() != date
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        reservations.sort_by_key(|r| (r.date(), r.time()));

        let offset = query.offset.unwrap_or(0);
        let reservations: Vec<_> = reservations.into_iter().skip(offset).collect();

        let reservations = if let Some(limit) = query.limit {
            reservations.into_iter().take(limit).collect()
        } else {
            reservations
        };

        Ok(reservations)
    }

    async fn for_table_on_dates(
        &self,
        table_id: TableId,
        dates: &[NaiveDate],
    ) -> Result<Vec<Reservation>> {
        let store = self.reservations.read().await;
        let mut reservations: Vec<_> = store
            .values()
            .filter(|r| r.table_id() == Some(table_id) && dates.contains(&r.date()))
            .cloned()
            .collect();
        reservations.sort_by_key(|r| (r.date(), r.time()));
        Ok(reservations)
    }

    async fn for_user_on_dates_excluding(
        &self,
        user_id: UserId,
        dates: &[NaiveDate],
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Reservation>> {
        let store = self.reservations.read().await;
        let mut reservations: Vec<_> = store
            .values()
            .filter(|r| {
                r.user_id() == user_id
                    && r.restaurant_id() != restaurant_id
                    && dates.contains(&r.date())
            })
            .cloned()
            .collect();
        reservations.sort_by_key(|r| (r.date(), r.time()));
        Ok(reservations)
    }

    async fn due_for_auto_advance(
        &self,
        state: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let store = self.reservations.read().await;
        let mut due: Vec<_> = store
            .values()
            .filter(|r| r.state() == state && r.end_time() <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.end_time());
        Ok(due)
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn history_for(&self, reservation_id: ReservationId) -> Result<Vec<HistoryEntry>> {
        let history = self.history.read().await;
        let mut entries: Vec<_> = history
            .iter()
            .filter(|e| e.reservation_id == reservation_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.at);
        Ok(entries)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn add(&self, notification: &Notification) -> Result<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut result: Vec<_> = notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(result)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(StoreError::NotificationNotFound(id))?;

        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(now);
        }
        Ok(notification.clone())
    }
}

#[async_trait]
impl RestaurantDirectory for InMemoryStore {
    async fn restaurant(&self, id: RestaurantId) -> Result<RestaurantInfo> {
        let restaurants = self.restaurants.read().await;
        restaurants
            .get(&id)
            .cloned()
            .ok_or(StoreError::RestaurantNotFound(id))
    }

    async fn table(&self, id: TableId) -> Result<TableInfo> {
        let tables = self.tables.read().await;
        tables.get(&id).cloned().ok_or(StoreError::TableNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 10).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booking(
        user_id: UserId,
        restaurant_id: RestaurantId,
        table_id: TableId,
        at: NaiveTime,
        minutes: i64,
    ) -> Reservation {
        Reservation::new(
            ReservationId::new(),
            user_id,
            restaurant_id,
            table_id,
            date(),
            at,
            minutes,
            2,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    fn long_before() -> DateTime<Utc> {
        date().and_time(t(0, 0)).and_utc() - Duration::days(1)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryStore::new();
        let r = booking(UserId::new(), RestaurantId::new(), TableId::new(), t(19, 0), 120);

        store.insert(&r, long_before()).await.unwrap();

        let loaded = store.get(r.id()).await.unwrap();
        assert_eq!(loaded.id(), r.id());
        assert_eq!(loaded.version(), 1);
    }

    #[tokio::test]
    async fn get_missing_reservation() {
        let store = InMemoryStore::new();
        let result = store.get(ReservationId::new()).await;
        assert!(matches!(result, Err(StoreError::ReservationNotFound(_))));
    }

    #[tokio::test]
    async fn insert_rejects_racing_table_conflict() {
        let store = InMemoryStore::new();
        let restaurant_id = RestaurantId::new();
        let table_id = TableId::new();

        let first = booking(UserId::new(), restaurant_id, table_id, t(19, 0), 120);
        store.insert(&first, long_before()).await.unwrap();

        let second = booking(UserId::new(), restaurant_id, table_id, t(20, 0), 120);
        let result = store.insert(&second, long_before()).await;
        assert!(matches!(result, Err(StoreError::TableConflict { .. })));
    }

    #[tokio::test]
    async fn insert_rejects_racing_user_conflict() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();

        let first = booking(user_id, RestaurantId::new(), TableId::new(), t(19, 0), 120);
        store.insert(&first, long_before()).await.unwrap();

        let elsewhere = booking(user_id, RestaurantId::new(), TableId::new(), t(20, 0), 120);
        let result = store.insert(&elsewhere, long_before()).await;
        assert!(matches!(result, Err(StoreError::UserConflict { .. })));
    }

    #[tokio::test]
    async fn insert_allows_same_user_same_restaurant_overlap() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let restaurant_id = RestaurantId::new();

        let first = booking(user_id, restaurant_id, TableId::new(), t(19, 0), 120);
        store.insert(&first, long_before()).await.unwrap();

        let second_table = booking(user_id, restaurant_id, TableId::new(), t(20, 0), 120);
        store.insert(&second_table, long_before()).await.unwrap();
        assert_eq!(store.reservation_count().await, 2);
    }

    #[tokio::test]
    async fn insert_ignores_elapsed_blocker() {
        let store = InMemoryStore::new();
        let restaurant_id = RestaurantId::new();
        let table_id = TableId::new();

        let first = booking(UserId::new(), restaurant_id, table_id, t(10, 0), 60);
        store.insert(&first, long_before()).await.unwrap();

        // The first window ended at 11:00; at noon the slot is free.
        let noon = date().and_time(t(12, 0)).and_utc();
        let second = booking(UserId::new(), restaurant_id, table_id, t(10, 30), 60);
        store.insert(&second, noon).await.unwrap();
    }

    #[tokio::test]
    async fn update_increments_version() {
        let store = InMemoryStore::new();
        let mut r = booking(UserId::new(), RestaurantId::new(), TableId::new(), t(19, 0), 120);
        store.insert(&r, long_before()).await.unwrap();

        r.confirm(Utc::now()).unwrap();
        let new_version = store.update(&r).await.unwrap();
        assert_eq!(new_version, 2);

        let loaded = store.get(r.id()).await.unwrap();
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.state(), ReservationState::Confirmed);
    }

    #[tokio::test]
    async fn update_detects_version_conflict() {
        let store = InMemoryStore::new();
        let r = booking(UserId::new(), RestaurantId::new(), TableId::new(), t(19, 0), 120);
        store.insert(&r, long_before()).await.unwrap();

        // Two actors load version 1.
        let mut first = store.get(r.id()).await.unwrap();
        let mut second = store.get(r.id()).await.unwrap();

        first.confirm(Utc::now()).unwrap();
        store.update(&first).await.unwrap();

        second.cancel(None, Utc::now()).unwrap();
        let result = store.update(&second).await;
        assert!(matches!(
            result,
            Err(StoreError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = InMemoryStore::new();
        let restaurant_id = RestaurantId::new();
        let user_id = UserId::new();

        let late = booking(user_id, restaurant_id, TableId::new(), t(21, 0), 60);
        let early = booking(user_id, restaurant_id, TableId::new(), t(18, 0), 60);
        let elsewhere = booking(UserId::new(), RestaurantId::new(), TableId::new(), t(19, 0), 60);
        store.insert(&late, long_before()).await.unwrap();
        store.insert(&early, long_before()).await.unwrap();
        store.insert(&elsewhere, long_before()).await.unwrap();

        let results = store
            .query(ReservationQuery::for_restaurant(restaurant_id))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id(), early.id());
        assert_eq!(results[1].id(), late.id());

        let by_state = store
            .query(
                ReservationQuery::for_user(user_id).state(ReservationState::Confirmed),
            )
            .await
            .unwrap();
        assert!(by_state.is_empty());
    }

    #[tokio::test]
    async fn due_for_auto_advance_picks_elapsed_only() {
        let store = InMemoryStore::new();
        let restaurant_id = RestaurantId::new();

        let elapsed = booking(UserId::new(), restaurant_id, TableId::new(), t(10, 0), 60);
        let running = booking(UserId::new(), restaurant_id, TableId::new(), t(11, 30), 60);
        store.insert(&elapsed, long_before()).await.unwrap();
        store.insert(&running, long_before()).await.unwrap();

        let noon = date().and_time(t(12, 0)).and_utc();
        let due = store
            .due_for_auto_advance(ReservationState::Requested, noon)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), elapsed.id());
    }

    #[tokio::test]
    async fn history_append_and_read() {
        let store = InMemoryStore::new();
        let reservation_id = ReservationId::new();
        let now = Utc::now();

        store
            .append_history(&HistoryEntry::created(
                reservation_id,
                domain::ChangedBy::System,
                now,
            ))
            .await
            .unwrap();
        store
            .append_history(&HistoryEntry::transition(
                reservation_id,
                ReservationState::Requested,
                ReservationState::Confirmed,
                domain::ChangedBy::System,
                None,
                now + Duration::minutes(5),
            ))
            .await
            .unwrap();

        let entries = store.history_for(reservation_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].from_state.is_none());
        assert_eq!(entries[1].to_state, ReservationState::Confirmed);
    }

    #[tokio::test]
    async fn notifications_for_user_and_mark_read() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let now = Utc::now();

        let n = Notification::new(
            user_id,
            crate::NotificationKind::ReservationConfirmed,
            "Reservation Confirmed",
            "Your reservation has been confirmed.",
            None,
            now,
        );
        store.add(&n).await.unwrap();

        let unread = store.for_user(user_id, true).await.unwrap();
        assert_eq!(unread.len(), 1);

        let read = store
            .mark_read(n.id, user_id, now + Duration::minutes(1))
            .await
            .unwrap();
        assert!(read.is_read);
        assert_eq!(read.read_at, Some(now + Duration::minutes(1)));

        // Second mark-read keeps the original timestamp.
        let again = store
            .mark_read(n.id, user_id, now + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(again.read_at, Some(now + Duration::minutes(1)));

        assert!(store.for_user(user_id, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_rejects_other_users() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let n = Notification::new(
            owner,
            crate::NotificationKind::ReservationRequested,
            "New Reservation",
            "A new reservation has been requested.",
            None,
            Utc::now(),
        );
        store.add(&n).await.unwrap();

        let result = store.mark_read(n.id, UserId::new(), Utc::now()).await;
        assert!(matches!(result, Err(StoreError::NotificationNotFound(_))));
    }

    #[tokio::test]
    async fn directory_lookup() {
        let store = InMemoryStore::new();
        let restaurant = RestaurantInfo {
            id: RestaurantId::new(),
            name: "Trattoria".to_string(),
            owner_id: UserId::new(),
            open_time: t(10, 0),
            close_time: t(23, 0),
            is_active: true,
        };
        let table = TableInfo {
            id: TableId::new(),
            restaurant_id: restaurant.id,
            capacity: 4,
            is_active: true,
        };
        store.add_restaurant(restaurant.clone()).await;
        store.add_table(table.clone()).await;

        let found = store.restaurant(restaurant.id).await.unwrap();
        assert_eq!(found.name, "Trattoria");
        let found = store.table(table.id).await.unwrap();
        assert_eq!(found.capacity, 4);

        assert!(matches!(
            store.restaurant(RestaurantId::new()).await,
            Err(StoreError::RestaurantNotFound(_))
        ));
    }
}
