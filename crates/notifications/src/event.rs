//! Status change events produced by the lifecycle layer.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use common::{ReservationId, UserId};
use domain::ReservationState;

/// Who a status change event is addressed to. The same transition can fan
/// out to the guest who holds the reservation and to the restaurant owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// The user who holds the reservation.
    Guest,
    /// The restaurant owner; carries the guest's display name for the
    /// owner-facing message text when one is known.
    Owner {
        owner_id: UserId,
        guest_name: Option<String>,
    },
}

/// Emitted when a reservation changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub reservation_id: ReservationId,
    /// Guest holding the reservation.
    pub user_id: UserId,
    /// None for the initial creation event.
    pub previous_state: Option<ReservationState>,
    pub new_state: ReservationState,
    pub restaurant_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub cancellation_reason: Option<String>,
    pub audience: Audience,
}

impl StatusChangedEvent {
    /// The user this event's notification should be delivered to.
    pub fn recipient(&self) -> UserId {
        match &self.audience {
            Audience::Guest => self.user_id,
            Audience::Owner { owner_id, .. } => *owner_id,
        }
    }
}
