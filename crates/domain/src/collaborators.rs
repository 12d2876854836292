//! Read-only collaborator snapshots and the reservation audit trail.
//!
//! Restaurants and tables are owned by other parts of the system; the
//! booking core only ever sees them as snapshots taken at validation time.

use chrono::{DateTime, NaiveTime, Utc};
use common::{ReservationId, RestaurantId, TableId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reservation::ReservationState;

/// Restaurant snapshot as seen by the booking core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantInfo {
    pub id: RestaurantId,
    pub name: String,
    /// Account that receives owner-facing notifications.
    pub owner_id: UserId,
    pub open_time: NaiveTime,
    /// May be numerically earlier than `open_time`, meaning the restaurant
    /// closes past midnight.
    pub close_time: NaiveTime,
    pub is_active: bool,
}

/// Table snapshot as seen by the booking core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: TableId,
    pub restaurant_id: RestaurantId,
    pub capacity: u32,
    pub is_active: bool,
}

/// Who performed a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangedBy {
    /// A user (guest or restaurant staff) acting through the API.
    User(UserId),
    /// The auto-advance scheduler.
    System,
}

impl std::fmt::Display for ChangedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangedBy::User(id) => write!(f, "user {id}"),
            ChangedBy::System => write!(f, "system"),
        }
    }
}

/// Append-only audit record, written once per state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub reservation_id: ReservationId,
    /// None for the creation record.
    pub from_state: Option<ReservationState>,
    pub to_state: ReservationState,
    pub changed_by: ChangedBy,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Records a state transition.
    pub fn transition(
        reservation_id: ReservationId,
        from_state: ReservationState,
        to_state: ReservationState,
        changed_by: ChangedBy,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation_id,
            from_state: Some(from_state),
            to_state,
            changed_by,
            note,
            at,
        }
    }

    /// Records the initial creation of a reservation.
    pub fn created(
        reservation_id: ReservationId,
        changed_by: ChangedBy,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation_id,
            from_state: None,
            to_state: ReservationState::Requested,
            changed_by,
            note: None,
            at,
        }
    }
}
