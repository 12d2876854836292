//! Reservation aggregate implementation.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use common::{ReservationId, RestaurantId, TableId, UserId};
use serde::{Deserialize, Serialize};

use super::{ReservationError, ReservationState};

/// Reservation aggregate root.
///
/// Holds a table at a restaurant for a user over a half-open time window
/// `[start_time, end_time)`. The state field is private and mutable only
/// through the named transition methods, which enforce the state machine and
/// stamp the corresponding timestamp exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier.
    id: ReservationId,

    /// User holding the reservation.
    user_id: UserId,

    /// Restaurant the reservation belongs to.
    restaurant_id: RestaurantId,

    /// Assigned table; None once a table has been released or unassigned.
    table_id: Option<TableId>,

    /// Calendar date of the booking.
    date: NaiveDate,

    /// Time of day the booking starts.
    time: NaiveTime,

    /// Length of the booking in minutes; always at least 1.
    duration_minutes: i64,

    /// Party size; always at least 1.
    guests: u32,

    /// Current lifecycle state.
    state: ReservationState,

    /// Version counter for optimistic concurrency.
    #[serde(default = "initial_version")]
    version: i64,

    /// Free-form requests from the guest.
    special_requests: Option<String>,

    created_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
}

fn initial_version() -> i64 {
    1
}

/// Fields that may change while a reservation is still Requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationEdit {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub guests: u32,
    pub special_requests: Option<String>,
}

impl Reservation {
    /// Creates a new reservation in the Requested state.
    ///
    /// Only the hard structural invariants are checked here (positive
    /// duration and guest count); availability rules run in the validator
    /// before the reservation is ever persisted.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ReservationId,
        user_id: UserId,
        restaurant_id: RestaurantId,
        table_id: TableId,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
        guests: u32,
        special_requests: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ReservationError> {
        if duration_minutes <= 0 {
            return Err(ReservationError::InvalidDuration {
                minutes: duration_minutes,
            });
        }
        if guests == 0 {
            return Err(ReservationError::InvalidGuestCount { guests });
        }

        Ok(Self {
            id,
            user_id,
            restaurant_id,
            table_id: Some(table_id),
            date,
            time,
            duration_minutes,
            guests,
            state: ReservationState::Requested,
            version: initial_version(),
            special_requests,
            created_at,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        })
    }

    /// Rehydrates a reservation from persisted fields without validation.
    ///
    /// Only the storage layer should call this.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ReservationId,
        user_id: UserId,
        restaurant_id: RestaurantId,
        table_id: Option<TableId>,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
        guests: u32,
        state: ReservationState,
        version: i64,
        special_requests: Option<String>,
        created_at: DateTime<Utc>,
        confirmed_at: Option<DateTime<Utc>>,
        cancelled_at: Option<DateTime<Utc>>,
        cancellation_reason: Option<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            restaurant_id,
            table_id,
            date,
            time,
            duration_minutes,
            guests,
            state,
            version,
            special_requests,
            created_at,
            confirmed_at,
            cancelled_at,
            cancellation_reason,
        }
    }
}

// Query methods
impl Reservation {
    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    pub fn guests(&self) -> u32 {
        self.guests
    }

    /// Returns the current state.
    pub fn state(&self) -> ReservationState {
        self.state
    }

    /// Returns the version used for optimistic concurrency.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Overwrites the version after a successful persisted update.
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    pub fn special_requests(&self) -> Option<&str> {
        self.special_requests.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// The instant the booking starts: `date + time`, interpreted as UTC.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }

    /// The instant the booking ends. Always strictly after `start_time`.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time() + Duration::minutes(self.duration_minutes)
    }

    /// Returns true if this reservation blocks its table (and counts toward
    /// the user's schedule) at the given instant.
    ///
    /// A reservation stops blocking once its window has elapsed even if it
    /// was never formally completed or expired; the scheduler's lag must not
    /// cause false double-booking rejections.
    pub fn blocks_at(&self, now: DateTime<Utc>) -> bool {
        !matches!(
            self.state,
            ReservationState::Cancelled | ReservationState::Expired
        ) && self.end_time() > now
    }

    /// Returns true if the reservation is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

// Transition methods
impl Reservation {
    /// Confirms a requested reservation, stamping `confirmed_at`.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if !self.state.can_confirm() {
            return Err(ReservationError::InvalidStateTransition {
                current_state: self.state,
                action: "confirm",
            });
        }
        self.state = ReservationState::Confirmed;
        self.confirmed_at = Some(now);
        Ok(())
    }

    /// Cancels a requested or confirmed reservation, recording the reason.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        if !self.state.can_cancel() {
            return Err(ReservationError::InvalidStateTransition {
                current_state: self.state,
                action: "cancel",
            });
        }
        self.state = ReservationState::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = reason;
        Ok(())
    }

    /// Completes a confirmed reservation.
    pub fn complete(&mut self) -> Result<(), ReservationError> {
        if !self.state.can_complete() {
            return Err(ReservationError::InvalidStateTransition {
                current_state: self.state,
                action: "complete",
            });
        }
        self.state = ReservationState::Completed;
        Ok(())
    }

    /// Expires a requested reservation whose window elapsed unconfirmed.
    pub fn expire(&mut self) -> Result<(), ReservationError> {
        if !self.state.can_expire() {
            return Err(ReservationError::InvalidStateTransition {
                current_state: self.state,
                action: "expire",
            });
        }
        self.state = ReservationState::Expired;
        Ok(())
    }

    /// Applies edited booking details. Legal only while still Requested.
    pub fn edit(&mut self, changes: ReservationEdit) -> Result<(), ReservationError> {
        if !self.state.can_edit() {
            return Err(ReservationError::InvalidStateTransition {
                current_state: self.state,
                action: "edit",
            });
        }
        if changes.duration_minutes <= 0 {
            return Err(ReservationError::InvalidDuration {
                minutes: changes.duration_minutes,
            });
        }
        if changes.guests == 0 {
            return Err(ReservationError::InvalidGuestCount {
                guests: changes.guests,
            });
        }
        self.date = changes.date;
        self.time = changes.time;
        self.duration_minutes = changes.duration_minutes;
        self.guests = changes.guests;
        self.special_requests = changes.special_requests;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested() -> Reservation {
        Reservation::new(
            ReservationId::new(),
            UserId::new(),
            RestaurantId::new(),
            TableId::new(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            120,
            4,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_reservation_is_requested() {
        let r = requested();
        assert_eq!(r.state(), ReservationState::Requested);
        assert_eq!(r.version(), 1);
        assert!(r.confirmed_at().is_none());
        assert!(r.cancelled_at().is_none());
    }

    #[test]
    fn test_end_time_is_after_start_time() {
        let r = requested();
        assert!(r.end_time() > r.start_time());
        assert_eq!(r.end_time() - r.start_time(), Duration::minutes(120));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let result = Reservation::new(
            ReservationId::new(),
            UserId::new(),
            RestaurantId::new(),
            TableId::new(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            0,
            2,
            None,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(ReservationError::InvalidDuration { minutes: 0 })
        ));
    }

    #[test]
    fn test_zero_guests_rejected() {
        let result = Reservation::new(
            ReservationId::new(),
            UserId::new(),
            RestaurantId::new(),
            TableId::new(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            60,
            0,
            None,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(ReservationError::InvalidGuestCount { guests: 0 })
        ));
    }

    #[test]
    fn test_confirm_sets_timestamp_once() {
        let mut r = requested();
        let now = Utc::now();
        r.confirm(now).unwrap();
        assert_eq!(r.state(), ReservationState::Confirmed);
        assert_eq!(r.confirmed_at(), Some(now));

        let result = r.confirm(now + Duration::minutes(5));
        assert!(matches!(
            result,
            Err(ReservationError::InvalidStateTransition { .. })
        ));
        assert_eq!(r.confirmed_at(), Some(now));
    }

    #[test]
    fn test_cancel_from_requested_records_reason() {
        let mut r = requested();
        let now = Utc::now();
        r.cancel(Some("change of plans".to_string()), now).unwrap();
        assert_eq!(r.state(), ReservationState::Cancelled);
        assert_eq!(r.cancelled_at(), Some(now));
        assert_eq!(r.cancellation_reason(), Some("change of plans"));
    }

    #[test]
    fn test_cancel_from_confirmed() {
        let mut r = requested();
        r.confirm(Utc::now()).unwrap();
        r.cancel(None, Utc::now()).unwrap();
        assert_eq!(r.state(), ReservationState::Cancelled);
    }

    #[test]
    fn test_cannot_cancel_twice() {
        let mut r = requested();
        r.cancel(None, Utc::now()).unwrap();
        let result = r.cancel(None, Utc::now());
        assert!(matches!(
            result,
            Err(ReservationError::InvalidStateTransition {
                current_state: ReservationState::Cancelled,
                action: "cancel",
            })
        ));
    }

    #[test]
    fn test_complete_requires_confirmed() {
        let mut r = requested();
        let result = r.complete();
        assert!(matches!(
            result,
            Err(ReservationError::InvalidStateTransition {
                current_state: ReservationState::Requested,
                ..
            })
        ));

        r.confirm(Utc::now()).unwrap();
        r.complete().unwrap();
        assert_eq!(r.state(), ReservationState::Completed);
        assert!(r.is_terminal());
    }

    #[test]
    fn test_expire_requires_requested() {
        let mut r = requested();
        r.expire().unwrap();
        assert_eq!(r.state(), ReservationState::Expired);

        let mut confirmed = requested();
        confirmed.confirm(Utc::now()).unwrap();
        assert!(confirmed.expire().is_err());
    }

    #[test]
    fn test_expired_never_completes() {
        let mut r = requested();
        r.expire().unwrap();
        assert!(r.complete().is_err());
        assert_eq!(r.state(), ReservationState::Expired);
    }

    #[test]
    fn test_edit_only_while_requested() {
        let mut r = requested();
        let changes = ReservationEdit {
            date: r.date(),
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            duration_minutes: 90,
            guests: 2,
            special_requests: Some("window seat".to_string()),
        };
        r.edit(changes.clone()).unwrap();
        assert_eq!(r.time(), NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(r.duration_minutes(), 90);
        assert_eq!(r.guests(), 2);
        assert_eq!(r.special_requests(), Some("window seat"));

        r.confirm(Utc::now()).unwrap();
        assert!(r.edit(changes).is_err());
    }

    #[test]
    fn test_edit_rejects_bad_fields() {
        let mut r = requested();
        let bad_duration = ReservationEdit {
            date: r.date(),
            time: r.time(),
            duration_minutes: 0,
            guests: 2,
            special_requests: None,
        };
        assert!(matches!(
            r.edit(bad_duration),
            Err(ReservationError::InvalidDuration { .. })
        ));

        let bad_guests = ReservationEdit {
            date: r.date(),
            time: r.time(),
            duration_minutes: 60,
            guests: 0,
            special_requests: None,
        };
        assert!(matches!(
            r.edit(bad_guests),
            Err(ReservationError::InvalidGuestCount { .. })
        ));
    }

    #[test]
    fn test_blocking_rules() {
        let r = requested();
        let before_end = r.end_time() - Duration::minutes(1);
        let after_end = r.end_time() + Duration::minutes(1);

        assert!(r.blocks_at(before_end));
        // Elapsed windows release the table even without a formal transition.
        assert!(!r.blocks_at(after_end));

        let mut cancelled = requested();
        cancelled.cancel(None, Utc::now()).unwrap();
        assert!(!cancelled.blocks_at(before_end));

        let mut expired = requested();
        expired.expire().unwrap();
        assert!(!expired.blocks_at(before_end));

        let mut completed = requested();
        completed.confirm(Utc::now()).unwrap();
        completed.complete().unwrap();
        // Completed before the window ends still holds the table.
        assert!(completed.blocks_at(before_end));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut r = requested();
        r.confirm(Utc::now()).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        let back: Reservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), r.id());
        assert_eq!(back.state(), ReservationState::Confirmed);
        assert_eq!(back.end_time(), r.end_time());
    }
}
