//! Reservation lifecycle orchestration.
//!
//! [`ReservationLifecycle`] is the write side of the booking system: it runs
//! availability validation, drives the state machine, persists through the
//! store with optimistic concurrency, records the audit trail, credits
//! loyalty points and fans out notifications. [`AutoAdvance`] is the
//! background scheduler that completes and expires reservations whose time
//! window has elapsed.

pub mod auto_advance;
pub mod error;
pub mod loyalty;
pub mod service;

pub use auto_advance::{AutoAdvance, TickOutcome};
pub use error::{LifecycleError, Result};
pub use loyalty::{
    InMemoryLoyaltyService, LoyaltyError, LoyaltyService, POINTS_PER_COMPLETED_RESERVATION,
};
pub use service::{CreateReservation, ReservationLifecycle};
