//! Reservation aggregate and related types.

mod aggregate;
mod state;

pub use aggregate::{Reservation, ReservationEdit};
pub use state::ReservationState;

use thiserror::Error;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Reservation is not in the expected state for the attempted action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: ReservationState,
        action: &'static str,
    },

    /// Duration must be at least one minute so `end_time > start_time` holds.
    #[error("Invalid duration: {minutes} minute(s) (must be greater than 0)")]
    InvalidDuration { minutes: i64 },

    /// At least one guest is required.
    #[error("Invalid guest count: {guests} (must be greater than 0)")]
    InvalidGuestCount { guests: u32 },
}
