//! Renders status change events into notification rows and publishes them.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use domain::ReservationState;
use reservation_store::{Notification, NotificationKind, NotificationStore};

use crate::event::StatusChangedEvent;
use crate::publisher::EventPublisher;
use crate::text::notification_text;

fn kind_for(state: ReservationState) -> NotificationKind {
    match state {
        ReservationState::Requested => NotificationKind::ReservationRequested,
        ReservationState::Confirmed => NotificationKind::ReservationConfirmed,
        ReservationState::Cancelled => NotificationKind::ReservationCancelled,
        ReservationState::Completed => NotificationKind::ReservationCompleted,
        ReservationState::Expired => NotificationKind::ReservationExpired,
    }
}

/// Turns status change events into persisted notifications and hands them
/// to the publisher.
///
/// Rows are written synchronously so a user who polls right after acting
/// sees the notification; publishing happens on a detached task. Failures
/// on either path are logged and swallowed, never surfaced to the caller.
pub struct NotificationDispatcher<N> {
    store: Arc<N>,
    publisher: Arc<dyn EventPublisher>,
}

impl<N> Clone for NotificationDispatcher<N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<N: NotificationStore + 'static> NotificationDispatcher<N> {
    pub fn new(store: Arc<N>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Dispatches a batch of events produced by one state transition.
    pub async fn dispatch(&self, events: Vec<StatusChangedEvent>, now: DateTime<Utc>) {
        for event in events {
            let (title, message) = notification_text(&event);
            let notification = Notification::new(
                event.recipient(),
                kind_for(event.new_state),
                title,
                message,
                Some(event.reservation_id),
                now,
            );

            match self.store.add(&notification).await {
                Ok(()) => {
                    metrics::counter!("notifications_persisted_total").increment(1);
                }
                Err(error) => {
                    tracing::warn!(
                        %error,
                        reservation_id = %event.reservation_id,
                        recipient = %event.recipient(),
                        "failed to persist notification"
                    );
                }
            }

            let publisher = Arc::clone(&self.publisher);
            tokio::spawn(async move {
                if let Err(error) = publisher.publish(&event).await {
                    tracing::warn!(
                        %error,
                        reservation_id = %event.reservation_id,
                        "failed to publish status change event"
                    );
                }
            });
        }
    }
}
