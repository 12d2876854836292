//! Reservation state machine.

use serde::{Deserialize, Serialize};

/// The state of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Requested ──┬──► Confirmed ──► Completed
///             │        │
///             │        └──► Cancelled
///             ├──► Cancelled
///             └──► Expired   (automatic only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReservationState {
    /// Reservation has been requested but not yet confirmed by the restaurant.
    #[default]
    Requested,

    /// Reservation has been confirmed by the restaurant.
    Confirmed,

    /// The dining experience finished (terminal state).
    Completed,

    /// Reservation was cancelled by the user or restaurant (terminal state).
    Cancelled,

    /// Reservation was never confirmed and its end time passed; set only by
    /// the auto-advance scheduler (terminal state).
    Expired,
}

impl ReservationState {
    /// Returns true if the reservation can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, ReservationState::Requested)
    }

    /// Returns true if the reservation can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ReservationState::Requested | ReservationState::Confirmed
        )
    }

    /// Returns true if the reservation can be completed in this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, ReservationState::Confirmed)
    }

    /// Returns true if the reservation can expire in this state.
    pub fn can_expire(&self) -> bool {
        matches!(self, ReservationState::Requested)
    }

    /// Returns true if booking details can still be edited in this state.
    pub fn can_edit(&self) -> bool {
        matches!(self, ReservationState::Requested)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationState::Completed | ReservationState::Cancelled | ReservationState::Expired
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Requested => "Requested",
            ReservationState::Confirmed => "Confirmed",
            ReservationState::Completed => "Completed",
            ReservationState::Cancelled => "Cancelled",
            ReservationState::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requested" => Ok(ReservationState::Requested),
            "Confirmed" => Ok(ReservationState::Confirmed),
            "Completed" => Ok(ReservationState::Completed),
            "Cancelled" => Ok(ReservationState::Cancelled),
            "Expired" => Ok(ReservationState::Expired),
            other => Err(format!("unknown reservation state: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_requested() {
        assert_eq!(ReservationState::default(), ReservationState::Requested);
    }

    #[test]
    fn test_only_requested_can_confirm() {
        assert!(ReservationState::Requested.can_confirm());
        assert!(!ReservationState::Confirmed.can_confirm());
        assert!(!ReservationState::Completed.can_confirm());
        assert!(!ReservationState::Cancelled.can_confirm());
        assert!(!ReservationState::Expired.can_confirm());
    }

    #[test]
    fn test_cancel_from_requested_or_confirmed() {
        assert!(ReservationState::Requested.can_cancel());
        assert!(ReservationState::Confirmed.can_cancel());
        assert!(!ReservationState::Completed.can_cancel());
        assert!(!ReservationState::Cancelled.can_cancel());
        assert!(!ReservationState::Expired.can_cancel());
    }

    #[test]
    fn test_only_confirmed_can_complete() {
        assert!(!ReservationState::Requested.can_complete());
        assert!(ReservationState::Confirmed.can_complete());
        assert!(!ReservationState::Completed.can_complete());
        assert!(!ReservationState::Cancelled.can_complete());
        assert!(!ReservationState::Expired.can_complete());
    }

    #[test]
    fn test_only_requested_can_expire() {
        assert!(ReservationState::Requested.can_expire());
        assert!(!ReservationState::Confirmed.can_expire());
        assert!(!ReservationState::Completed.can_expire());
        assert!(!ReservationState::Cancelled.can_expire());
        assert!(!ReservationState::Expired.can_expire());
    }

    #[test]
    fn test_only_requested_can_edit() {
        assert!(ReservationState::Requested.can_edit());
        assert!(!ReservationState::Confirmed.can_edit());
        assert!(!ReservationState::Completed.can_edit());
        assert!(!ReservationState::Cancelled.can_edit());
        assert!(!ReservationState::Expired.can_edit());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ReservationState::Requested.is_terminal());
        assert!(!ReservationState::Confirmed.is_terminal());
        assert!(ReservationState::Completed.is_terminal());
        assert!(ReservationState::Cancelled.is_terminal());
        assert!(ReservationState::Expired.is_terminal());
    }

    #[test]
    fn test_display_and_parse() {
        for state in [
            ReservationState::Requested,
            ReservationState::Confirmed,
            ReservationState::Completed,
            ReservationState::Cancelled,
            ReservationState::Expired,
        ] {
            let parsed: ReservationState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("Pending".parse::<ReservationState>().is_err());
    }

    #[test]
    fn test_serialization() {
        let state = ReservationState::Confirmed;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: ReservationState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
