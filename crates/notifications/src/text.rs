//! Notification title and message rendering.

use domain::ReservationState;

use crate::event::{Audience, StatusChangedEvent};

/// Renders the title and message for a status change event.
pub fn notification_text(event: &StatusChangedEvent) -> (String, String) {
    match &event.audience {
        Audience::Guest => guest_text(event),
        Audience::Owner { guest_name, .. } => owner_text(event, guest_name.as_deref()),
    }
}

fn guest_text(event: &StatusChangedEvent) -> (String, String) {
    let date = event.date.format("%Y-%m-%d");
    let time = event.time.format("%H:%M");
    let place = if event.restaurant_name.trim().is_empty() {
        "your reservation".to_string()
    } else {
        event.restaurant_name.clone()
    };

    match event.new_state {
        ReservationState::Confirmed => (
            "Reservation confirmed".to_string(),
            format!("Your reservation at {place} on {date} at {time} has been confirmed."),
        ),
        ReservationState::Cancelled => (
            "Reservation cancelled".to_string(),
            match event.cancellation_reason.as_deref() {
                Some(reason) if !reason.trim().is_empty() => format!(
                    "Your reservation at {place} on {date} at {time} has been cancelled. Reason: {reason}"
                ),
                _ => format!(
                    "Your reservation at {place} on {date} at {time} has been cancelled."
                ),
            },
        ),
        ReservationState::Completed => (
            "Reservation completed".to_string(),
            format!(
                "Your reservation at {place} on {date} at {time} has been marked as completed. Thank you!"
            ),
        ),
        state => (
            "Reservation update".to_string(),
            format!("Your reservation at {place} on {date} at {time} is now {state}."),
        ),
    }
}

fn owner_text(event: &StatusChangedEvent, guest_name: Option<&str>) -> (String, String) {
    let date = event.date.format("%Y-%m-%d");
    let time = event.time.format("%H:%M");
    let guest = match guest_name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => "A guest".to_string(),
    };
    let place = if event.restaurant_name.trim().is_empty() {
        "your restaurant".to_string()
    } else {
        event.restaurant_name.clone()
    };

    match event.new_state {
        ReservationState::Requested => (
            "New reservation request".to_string(),
            format!("{guest} requested a table at {place} on {date} at {time}."),
        ),
        ReservationState::Cancelled => (
            "Reservation cancelled".to_string(),
            match event.cancellation_reason.as_deref() {
                Some(reason) if !reason.trim().is_empty() => format!(
                    "{guest} cancelled their reservation at {place} on {date} at {time}. Reason: {reason}"
                ),
                _ => format!(
                    "{guest} cancelled their reservation at {place} on {date} at {time}."
                ),
            },
        ),
        state => (
            "Reservation update".to_string(),
            format!("The reservation by {guest} at {place} on {date} at {time} is now {state}."),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use common::{ReservationId, UserId};

    fn event(new_state: ReservationState, audience: Audience) -> StatusChangedEvent {
        StatusChangedEvent {
            reservation_id: ReservationId::new(),
            user_id: UserId::new(),
            previous_state: Some(ReservationState::Requested),
            new_state,
            restaurant_name: "Trattoria".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 10).unwrap(),
            time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            cancellation_reason: None,
            audience,
        }
    }

    #[test]
    fn test_confirmed_guest_text() {
        let (title, message) = notification_text(&event(ReservationState::Confirmed, Audience::Guest));
        assert_eq!(title, "Reservation confirmed");
        assert_eq!(
            message,
            "Your reservation at Trattoria on 2026-06-10 at 19:30 has been confirmed."
        );
    }

    #[test]
    fn test_cancelled_guest_text_with_reason() {
        let mut e = event(ReservationState::Cancelled, Audience::Guest);
        e.cancellation_reason = Some("kitchen flooded".to_string());
        let (title, message) = notification_text(&e);
        assert_eq!(title, "Reservation cancelled");
        assert!(message.ends_with("has been cancelled. Reason: kitchen flooded"));

        e.cancellation_reason = None;
        let (_, message) = notification_text(&e);
        assert!(message.ends_with("has been cancelled."));
    }

    #[test]
    fn test_completed_guest_text() {
        let (title, message) = notification_text(&event(ReservationState::Completed, Audience::Guest));
        assert_eq!(title, "Reservation completed");
        assert!(message.ends_with("has been marked as completed. Thank you!"));
    }

    #[test]
    fn test_expired_falls_back_to_update_text() {
        let (title, message) = notification_text(&event(ReservationState::Expired, Audience::Guest));
        assert_eq!(title, "Reservation update");
        assert!(message.ends_with("is now Expired."));
    }

    #[test]
    fn test_blank_restaurant_name_falls_back() {
        let mut e = event(ReservationState::Confirmed, Audience::Guest);
        e.restaurant_name = "  ".to_string();
        let (_, message) = notification_text(&e);
        assert!(message.starts_with("Your reservation at your reservation on"));
    }

    #[test]
    fn test_requested_owner_text() {
        let owner = Audience::Owner {
            owner_id: UserId::new(),
            guest_name: Some("Ana".to_string()),
        };
        let mut e = event(ReservationState::Requested, owner);
        e.previous_state = None;
        let (title, message) = notification_text(&e);
        assert_eq!(title, "New reservation request");
        assert_eq!(
            message,
            "Ana requested a table at Trattoria on 2026-06-10 at 19:30."
        );
    }

    #[test]
    fn test_owner_text_without_guest_name() {
        let owner = Audience::Owner {
            owner_id: UserId::new(),
            guest_name: None,
        };
        let (_, message) = notification_text(&event(ReservationState::Cancelled, owner));
        assert!(message.starts_with("A guest cancelled their reservation at Trattoria"));
    }
}
