//! Background scheduler that advances reservations past their end time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use domain::{ChangedBy, Clock, ReservationState};
use reservation_store::{NotificationStore, ReservationStore, RestaurantDirectory};

use crate::service::ReservationLifecycle;

/// Minimum polling interval. Configured values below this are clamped.
const MIN_INTERVAL: Duration = Duration::from_secs(5);

/// What a single scheduler pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub completed: usize,
    pub expired: usize,
}

/// Periodically completes confirmed reservations and expires requested ones
/// once their time window has elapsed.
///
/// Each due reservation is advanced independently: one failure is logged
/// and skipped so the rest of the batch still goes through.
pub struct AutoAdvance<S> {
    lifecycle: ReservationLifecycle<S>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl<S> AutoAdvance<S>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    pub fn new(
        lifecycle: ReservationLifecycle<S>,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            lifecycle,
            store,
            clock,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// The effective polling interval after clamping.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one scheduler pass and returns what it advanced.
    #[tracing::instrument(skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.now();
        let mut outcome = TickOutcome::default();

        match self
            .store
            .due_for_auto_advance(ReservationState::Confirmed, now)
            .await
        {
            Ok(due) => {
                for reservation in due {
                    match self
                        .lifecycle
                        .complete(reservation.id(), ChangedBy::System)
                        .await
                    {
                        Ok(completed) => {
                            outcome.completed += 1;
                            metrics::counter!("reservations_auto_completed_total").increment(1);
                            tracing::info!(
                                reservation_id = %completed.id(),
                                end_time = %completed.end_time(),
                                "auto-completed reservation"
                            );
                        }
                        Err(error) => {
                            tracing::warn!(
                                reservation_id = %reservation.id(),
                                %error,
                                "cannot auto-complete reservation"
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::error!(%error, "failed to load reservations due for completion");
            }
        }

        match self
            .store
            .due_for_auto_advance(ReservationState::Requested, now)
            .await
        {
            Ok(due) => {
                for reservation in due {
                    match self.lifecycle.expire(reservation.id()).await {
                        Ok(expired) => {
                            outcome.expired += 1;
                            metrics::counter!("reservations_auto_expired_total").increment(1);
                            tracing::info!(
                                reservation_id = %expired.id(),
                                end_time = %expired.end_time(),
                                "auto-expired reservation"
                            );
                        }
                        Err(error) => {
                            tracing::warn!(
                                reservation_id = %reservation.id(),
                                %error,
                                "cannot auto-expire reservation"
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::error!(%error, "failed to load reservations due for expiry");
            }
        }

        if outcome.completed > 0 || outcome.expired > 0 {
            tracing::info!(
                completed = outcome.completed,
                expired = outcome.expired,
                "auto-advance pass finished"
            );
        }

        outcome
    }

    /// Runs the scheduler loop until the shutdown signal flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "auto-advance scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("auto-advance scheduler stopping");
    }
}
