//! Shared identifier types for the reservation system.

mod types;

pub use types::{ReservationId, RestaurantId, TableId, UserId};
