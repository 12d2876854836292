//! Domain layer for the reservation system.
//!
//! This crate provides the core booking rules:
//! - Reservation aggregate with an encapsulated state machine
//! - Availability validation (working hours, capacity, interval overlap)
//! - Clock abstraction so time-based rules are deterministic under test
//! - Read-only collaborator snapshots (restaurant, table) and the audit trail

pub mod availability;
pub mod clock;
pub mod collaborators;
pub mod reservation;

pub use availability::{RejectionReason, intervals_overlap, scan_dates, validate, within_working_hours};
pub use clock::{Clock, FixedClock, SystemClock};
pub use collaborators::{ChangedBy, HistoryEntry, RestaurantInfo, TableInfo};
pub use reservation::{Reservation, ReservationEdit, ReservationError, ReservationState};
