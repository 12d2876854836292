//! Persisted in-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{ReservationId, UserId};

/// Category of a notification, stored alongside the rendered text so
/// clients can filter and style without parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    ReservationRequested,
    ReservationConfirmed,
    ReservationCancelled,
    ReservationCompleted,
    ReservationExpired,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ReservationRequested => "ReservationRequested",
            NotificationKind::ReservationConfirmed => "ReservationConfirmed",
            NotificationKind::ReservationCancelled => "ReservationCancelled",
            NotificationKind::ReservationCompleted => "ReservationCompleted",
            NotificationKind::ReservationExpired => "ReservationExpired",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ReservationRequested" => Ok(NotificationKind::ReservationRequested),
            "ReservationConfirmed" => Ok(NotificationKind::ReservationConfirmed),
            "ReservationCancelled" => Ok(NotificationKind::ReservationCancelled),
            "ReservationCompleted" => Ok(NotificationKind::ReservationCompleted),
            "ReservationExpired" => Ok(NotificationKind::ReservationExpired),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// An in-app notification row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Recipient.
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Reservation this notification refers to, when there is one.
    pub reservation_id: Option<ReservationId>,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Creates an unread notification.
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        reservation_id: Option<ReservationId>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            reservation_id,
            is_read: false,
            sent_at,
            read_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notification_is_unread() {
        let n = Notification::new(
            UserId::new(),
            NotificationKind::ReservationConfirmed,
            "Reservation Confirmed",
            "Your reservation has been confirmed.",
            Some(ReservationId::new()),
            Utc::now(),
        );
        assert!(!n.is_read);
        assert!(n.read_at.is_none());
    }

    #[test]
    fn test_kind_display_and_parse() {
        for kind in [
            NotificationKind::ReservationRequested,
            NotificationKind::ReservationConfirmed,
            NotificationKind::ReservationCancelled,
            NotificationKind::ReservationCompleted,
            NotificationKind::ReservationExpired,
        ] {
            let parsed: NotificationKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("TableReady".parse::<NotificationKind>().is_err());
    }
}
