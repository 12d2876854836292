//! The reservation lifecycle service.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use common::{ReservationId, RestaurantId, TableId, UserId};
use domain::{
    ChangedBy, Clock, HistoryEntry, Reservation, ReservationEdit, ReservationState,
    availability::{scan_dates, validate},
};
use notifications::{Audience, NotificationDispatcher, StatusChangedEvent};
use reservation_store::{
    NotificationStore, ReservationQuery, ReservationStore, RestaurantDirectory,
};

use crate::Result;
use crate::loyalty::LoyaltyService;

/// Command to create a new reservation.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub guests: u32,
    pub special_requests: Option<String>,
}

impl CreateReservation {
    /// Creates a command with a fresh reservation id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        restaurant_id: RestaurantId,
        table_id: TableId,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
        guests: u32,
    ) -> Self {
        Self {
            reservation_id: ReservationId::new(),
            user_id,
            restaurant_id,
            table_id,
            date,
            time,
            duration_minutes,
            guests,
            special_requests: None,
        }
    }

    pub fn with_special_requests(mut self, requests: impl Into<String>) -> Self {
        self.special_requests = Some(requests.into());
        self
    }
}

/// Orchestrates the reservation lifecycle over a storage backend.
///
/// Every mutation follows the same shape: load (or build), run the domain
/// transition, persist with the loaded version, append the audit record,
/// then dispatch notifications. Notifications and loyalty crediting are
/// best-effort and never fail the operation that triggered them.
pub struct ReservationLifecycle<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    loyalty: Arc<dyn LoyaltyService>,
    dispatcher: NotificationDispatcher<S>,
}

impl<S> Clone for ReservationLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            loyalty: Arc::clone(&self.loyalty),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S> ReservationLifecycle<S>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        loyalty: Arc<dyn LoyaltyService>,
        dispatcher: NotificationDispatcher<S>,
    ) -> Self {
        Self {
            store,
            clock,
            loyalty,
            dispatcher,
        }
    }

    /// Creates a reservation after running the availability rules.
    #[tracing::instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id))]
    pub async fn create(&self, cmd: CreateReservation) -> Result<Reservation> {
        let now = self.clock.now();

        let restaurant = self.store.restaurant(cmd.restaurant_id).await?;
        let table = self.store.table(cmd.table_id).await?;

        let reservation = Reservation::new(
            cmd.reservation_id,
            cmd.user_id,
            cmd.restaurant_id,
            cmd.table_id,
            cmd.date,
            cmd.time,
            cmd.duration_minutes,
            cmd.guests,
            cmd.special_requests,
            now,
        )?;

        let dates = self.dates_to_scan(&reservation);
        let table_neighbors = self.store.for_table_on_dates(cmd.table_id, &dates).await?;
        let user_neighbors = self
            .store
            .for_user_on_dates_excluding(cmd.user_id, &dates, cmd.restaurant_id)
            .await?;

        validate(
            &reservation,
            &restaurant,
            &table,
            &table_neighbors,
            &user_neighbors,
            now,
        )?;

        self.store.insert(&reservation, now).await?;
        self.store
            .append_history(&HistoryEntry::created(
                reservation.id(),
                ChangedBy::User(cmd.user_id),
                now,
            ))
            .await?;

        metrics::counter!("reservations_created_total").increment(1);
        tracing::info!(state = %reservation.state(), "reservation created");

        let events = vec![
            self.status_event(&reservation, &restaurant.name, None, Audience::Guest),
            self.status_event(
                &reservation,
                &restaurant.name,
                None,
                Audience::Owner {
                    owner_id: restaurant.owner_id,
                    guest_name: None,
                },
            ),
        ];
        self.dispatcher.dispatch(events, now).await;

        Ok(reservation)
    }

    /// Confirms a requested reservation.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        id: ReservationId,
        changed_by: ChangedBy,
    ) -> Result<Reservation> {
        let now = self.clock.now();
        let mut reservation = self.store.get(id).await?;
        let previous = reservation.state();

        reservation.confirm(now)?;
        let version = self.store.update(&reservation).await?;
        reservation.set_version(version);

        self.store
            .append_history(&HistoryEntry::transition(
                id,
                previous,
                reservation.state(),
                changed_by,
                None,
                now,
            ))
            .await?;

        metrics::counter!("reservations_confirmed_total").increment(1);
        tracing::info!("reservation confirmed");

        let restaurant_name = self.restaurant_name(&reservation).await;
        let event =
            self.status_event(&reservation, &restaurant_name, Some(previous), Audience::Guest);
        self.dispatcher.dispatch(vec![event], now).await;

        Ok(reservation)
    }

    /// Cancels a requested or confirmed reservation, recording the reason.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        id: ReservationId,
        reason: Option<String>,
        changed_by: ChangedBy,
    ) -> Result<Reservation> {
        let now = self.clock.now();
        let mut reservation = self.store.get(id).await?;
        let previous = reservation.state();

        reservation.cancel(reason.clone(), now)?;
        let version = self.store.update(&reservation).await?;
        reservation.set_version(version);

        self.store
            .append_history(&HistoryEntry::transition(
                id,
                previous,
                reservation.state(),
                changed_by,
                reason,
                now,
            ))
            .await?;

        metrics::counter!("reservations_cancelled_total").increment(1);
        tracing::info!("reservation cancelled");

        let restaurant = self.store.restaurant(reservation.restaurant_id()).await;
        let (restaurant_name, owner_id) = match &restaurant {
            Ok(r) => (r.name.clone(), Some(r.owner_id)),
            Err(error) => {
                tracing::warn!(%error, "restaurant lookup failed for notification");
                (String::new(), None)
            }
        };

        let mut events = vec![self.status_event(
            &reservation,
            &restaurant_name,
            Some(previous),
            Audience::Guest,
        )];
        // The owner hears about it when the guest cancels their own booking.
        if let (ChangedBy::User(actor), Some(owner_id)) = (changed_by, owner_id)
            && actor == reservation.user_id()
        {
            events.push(self.status_event(
                &reservation,
                &restaurant_name,
                Some(previous),
                Audience::Owner {
                    owner_id,
                    guest_name: None,
                },
            ));
        }
        self.dispatcher.dispatch(events, now).await;

        Ok(reservation)
    }

    /// Completes a confirmed reservation and credits loyalty points.
    #[tracing::instrument(skip(self))]
    pub async fn complete(
        &self,
        id: ReservationId,
        changed_by: ChangedBy,
    ) -> Result<Reservation> {
        let now = self.clock.now();
        let mut reservation = self.store.get(id).await?;
        let previous = reservation.state();

        reservation.complete()?;
        let version = self.store.update(&reservation).await?;
        reservation.set_version(version);

        self.store
            .append_history(&HistoryEntry::transition(
                id,
                previous,
                reservation.state(),
                changed_by,
                None,
                now,
            ))
            .await?;

        if let Err(error) = self.loyalty.credit_completed(&reservation).await {
            tracing::warn!(%error, "loyalty crediting failed");
        }

        metrics::counter!("reservations_completed_total").increment(1);
        tracing::info!("reservation completed");

        let restaurant_name = self.restaurant_name(&reservation).await;
        let event =
            self.status_event(&reservation, &restaurant_name, Some(previous), Audience::Guest);
        self.dispatcher.dispatch(vec![event], now).await;

        Ok(reservation)
    }

    /// Expires a requested reservation whose window elapsed unconfirmed.
    ///
    /// Only the auto-advance scheduler calls this; there is no user-facing
    /// expire action.
    #[tracing::instrument(skip(self))]
    pub async fn expire(&self, id: ReservationId) -> Result<Reservation> {
        let now = self.clock.now();
        let mut reservation = self.store.get(id).await?;
        let previous = reservation.state();

        reservation.expire()?;
        let version = self.store.update(&reservation).await?;
        reservation.set_version(version);

        self.store
            .append_history(&HistoryEntry::transition(
                id,
                previous,
                reservation.state(),
                ChangedBy::System,
                None,
                now,
            ))
            .await?;

        metrics::counter!("reservations_expired_total").increment(1);
        tracing::info!("reservation expired");

        let restaurant = self.store.restaurant(reservation.restaurant_id()).await;
        let (restaurant_name, owner_id) = match &restaurant {
            Ok(r) => (r.name.clone(), Some(r.owner_id)),
            Err(error) => {
                tracing::warn!(%error, "restaurant lookup failed for notification");
                (String::new(), None)
            }
        };

        let mut events = vec![self.status_event(
            &reservation,
            &restaurant_name,
            Some(previous),
            Audience::Guest,
        )];
        if let Some(owner_id) = owner_id {
            events.push(self.status_event(
                &reservation,
                &restaurant_name,
                Some(previous),
                Audience::Owner {
                    owner_id,
                    guest_name: None,
                },
            ));
        }
        self.dispatcher.dispatch(events, now).await;

        Ok(reservation)
    }

    /// Edits booking details while the reservation is still Requested.
    ///
    /// The edited booking is re-validated against availability as if it were
    /// a new request, with the reservation's own row excluded from the
    /// conflict scan.
    #[tracing::instrument(skip(self, changes))]
    pub async fn edit(
        &self,
        id: ReservationId,
        changes: ReservationEdit,
        changed_by: ChangedBy,
    ) -> Result<Reservation> {
        let now = self.clock.now();
        let mut reservation = self.store.get(id).await?;

        reservation.edit(changes)?;

        let restaurant = self.store.restaurant(reservation.restaurant_id()).await?;
        let table = match reservation.table_id() {
            Some(table_id) => self.store.table(table_id).await?,
            None => return Err(crate::LifecycleError::NoTableAssigned(id)),
        };

        let dates = self.dates_to_scan(&reservation);
        let table_neighbors = self.store.for_table_on_dates(table.id, &dates).await?;
        let user_neighbors = self
            .store
            .for_user_on_dates_excluding(
                reservation.user_id(),
                &dates,
                reservation.restaurant_id(),
            )
            .await?;

        validate(
            &reservation,
            &restaurant,
            &table,
            &table_neighbors,
            &user_neighbors,
            now,
        )?;

        let version = self.store.update(&reservation).await?;
        reservation.set_version(version);

        self.store
            .append_history(&HistoryEntry::transition(
                id,
                reservation.state(),
                reservation.state(),
                changed_by,
                Some("Booking details updated".to_string()),
                now,
            ))
            .await?;

        metrics::counter!("reservations_edited_total").increment(1);
        tracing::info!("reservation edited");

        Ok(reservation)
    }

    /// Retrieves a reservation by id.
    pub async fn get(&self, id: ReservationId) -> Result<Reservation> {
        Ok(self.store.get(id).await?)
    }

    /// Lists reservations matching a query.
    pub async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        Ok(self.store.query(query).await?)
    }

    /// Returns the audit trail for a reservation, oldest first.
    pub async fn history(&self, id: ReservationId) -> Result<Vec<HistoryEntry>> {
        // Surface NotFound for unknown ids instead of an empty list.
        self.store.get(id).await?;
        Ok(self.store.history_for(id).await?)
    }

    fn dates_to_scan(&self, reservation: &Reservation) -> Vec<NaiveDate> {
        let (first, last) = scan_dates(reservation);
        if first == last {
            vec![first]
        } else {
            vec![first, last]
        }
    }

    async fn restaurant_name(&self, reservation: &Reservation) -> String {
        match self.store.restaurant(reservation.restaurant_id()).await {
            Ok(restaurant) => restaurant.name,
            Err(error) => {
                tracing::warn!(%error, "restaurant lookup failed for notification");
                String::new()
            }
        }
    }

    fn status_event(
        &self,
        reservation: &Reservation,
        restaurant_name: &str,
        previous_state: Option<ReservationState>,
        audience: Audience,
    ) -> StatusChangedEvent {
        StatusChangedEvent {
            reservation_id: reservation.id(),
            user_id: reservation.user_id(),
            previous_state,
            new_state: reservation.state(),
            restaurant_name: restaurant_name.to_string(),
            date: reservation.date(),
            time: reservation.time(),
            cancellation_reason: reservation.cancellation_reason().map(String::from),
            audience,
        }
    }
}
