//! Availability validation for candidate reservations.
//!
//! Pure functions: the caller supplies the restaurant/table snapshots, the
//! neighbouring reservations fetched from storage and the current instant.
//! Nothing here performs IO, so every rule is directly unit-testable.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::collaborators::{RestaurantInfo, TableInfo};
use crate::reservation::Reservation;

/// Why a candidate reservation was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Number of guests must be greater than zero")]
    NoGuests,

    #[error("Number of guests ({guests}) exceeds table capacity ({capacity})")]
    OverCapacity { guests: u32, capacity: u32 },

    #[error("Reservation duration must be greater than zero")]
    NonPositiveDuration,

    #[error("Reservation time {start} is in the past")]
    InPast { start: DateTime<Utc> },

    #[error(
        "Reservation time {start}-{end} is outside restaurant working hours {open}-{close}"
    )]
    OutsideWorkingHours {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        open: NaiveTime,
        close: NaiveTime,
    },

    #[error("Table is already reserved from {start} to {end}")]
    TableConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(
        "User already has a reservation from {start} to {end} in another restaurant"
    )]
    UserConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Restaurant is not active")]
    RestaurantInactive,

    #[error("Table is not active")]
    TableInactive,

    #[error("Table does not belong to the requested restaurant")]
    TableNotInRestaurant,
}

/// Half-open interval overlap: `[s1, e1)` and `[s2, e2)` overlap iff
/// `s1 < e2 && s2 < e1`. Back-to-back bookings never overlap.
pub fn intervals_overlap(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// The calendar dates a conflict scan must cover for a candidate: its own
/// date plus the date its window ends on (differs when it spans midnight).
pub fn scan_dates(candidate: &Reservation) -> (NaiveDate, NaiveDate) {
    (candidate.date(), candidate.end_time().date_naive())
}

/// Checks the candidate window against the restaurant's working hours.
///
/// When `close < open` the restaurant operates past midnight and the close
/// boundary belongs to the next day. A candidate that itself crosses
/// midnight must then fit the wrapped window entirely; a same-day candidate
/// is rejected only when it starts before opening and ends at or before the
/// previous day's wrapped closing boundary.
pub fn within_working_hours(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    date: NaiveDate,
    open: NaiveTime,
    close: NaiveTime,
) -> bool {
    let open_at = date.and_time(open).and_utc();
    let close_at = date.and_time(close).and_utc();

    if close < open {
        let close_at = close_at + Duration::days(1);
        if end.date_naive() > start.date_naive() {
            // Spans midnight: both ends must fit the wrapped window,
            // e.g. 22:00-02:00 hours admit a 23:00-01:00 booking.
            !(start < open_at || end > close_at)
        } else {
            let previous_day_close = close_at - Duration::days(1);
            !(start < open_at && end <= previous_day_close)
        }
    } else {
        !(start < open_at || end > close_at)
    }
}

/// Decides whether a candidate reservation may be booked.
///
/// `table_neighbors` are reservations on the same table at the same
/// restaurant; `user_neighbors` are the same user's reservations at *other*
/// restaurants. Both lists are expected to be pre-filtered to the candidate's
/// scan dates and to exclude the candidate's own row when re-validating an
/// edit. Overlapping reservations by the same user at the same restaurant
/// (different tables) are deliberately permitted.
pub fn validate(
    candidate: &Reservation,
    restaurant: &RestaurantInfo,
    table: &TableInfo,
    table_neighbors: &[Reservation],
    user_neighbors: &[Reservation],
    now: DateTime<Utc>,
) -> Result<(), RejectionReason> {
    if !restaurant.is_active {
        return Err(RejectionReason::RestaurantInactive);
    }
    if table.restaurant_id != restaurant.id {
        return Err(RejectionReason::TableNotInRestaurant);
    }
    if !table.is_active {
        return Err(RejectionReason::TableInactive);
    }

    if candidate.guests() == 0 {
        return Err(RejectionReason::NoGuests);
    }
    if candidate.guests() > table.capacity {
        return Err(RejectionReason::OverCapacity {
            guests: candidate.guests(),
            capacity: table.capacity,
        });
    }

    if candidate.duration_minutes() <= 0 {
        return Err(RejectionReason::NonPositiveDuration);
    }

    let start = candidate.start_time();
    let end = candidate.end_time();

    if start < now {
        return Err(RejectionReason::InPast { start });
    }

    if !within_working_hours(
        start,
        end,
        candidate.date(),
        restaurant.open_time,
        restaurant.close_time,
    ) {
        return Err(RejectionReason::OutsideWorkingHours {
            start,
            end,
            open: restaurant.open_time,
            close: restaurant.close_time,
        });
    }

    if let Some(existing) = first_blocking_overlap(candidate, user_neighbors, now) {
        return Err(RejectionReason::UserConflict {
            start: existing.start_time(),
            end: existing.end_time(),
        });
    }

    if let Some(existing) = first_blocking_overlap(candidate, table_neighbors, now) {
        return Err(RejectionReason::TableConflict {
            start: existing.start_time(),
            end: existing.end_time(),
        });
    }

    Ok(())
}

fn first_blocking_overlap<'a>(
    candidate: &Reservation,
    neighbors: &'a [Reservation],
    now: DateTime<Utc>,
) -> Option<&'a Reservation> {
    neighbors.iter().find(|existing| {
        existing.id() != candidate.id()
            && existing.blocks_at(now)
            && intervals_overlap(
                candidate.start_time(),
                candidate.end_time(),
                existing.start_time(),
                existing.end_time(),
            )
    })
}
