use thiserror::Error;

use domain::{RejectionReason, ReservationError};
use reservation_store::StoreError;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The booking failed availability validation.
    #[error("{0}")]
    Rejected(#[from] RejectionReason),

    /// The reservation is not in a state that allows the attempted action.
    #[error(transparent)]
    Transition(#[from] ReservationError),

    /// Storage failed (including version and write-time booking conflicts).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reservation has no table assigned, so it cannot be re-validated.
    #[error("Reservation {0} has no table assigned")]
    NoTableAssigned(common::ReservationId),
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
