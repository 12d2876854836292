//! Loyalty point crediting for completed reservations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use common::{ReservationId, UserId};
use domain::{Reservation, ReservationState};

/// Points credited for each completed reservation.
pub const POINTS_PER_COMPLETED_RESERVATION: i64 = 10;

/// Error returned when loyalty crediting fails.
#[derive(Debug, Clone, Error)]
#[error("Loyalty error: {0}")]
pub struct LoyaltyError(pub String);

/// Credits loyalty points when reservations complete.
///
/// Crediting is idempotent per reservation: retries and scheduler overlap
/// must never award points twice.
#[async_trait]
pub trait LoyaltyService: Send + Sync {
    /// Credits points for a completed reservation. A reservation that is not
    /// in the Completed state, or was already credited, is a no-op.
    async fn credit_completed(&self, reservation: &Reservation) -> Result<(), LoyaltyError>;

    /// Returns `(current_points, total_points_earned)` for a user.
    async fn points_for_user(&self, user_id: UserId) -> Result<(i64, i64), LoyaltyError>;
}

#[derive(Default)]
struct Ledger {
    /// user -> (current points, total points earned)
    accounts: HashMap<UserId, (i64, i64)>,
    /// reservations already credited
    credited: HashSet<ReservationId>,
}

/// In-memory loyalty ledger for testing and local development.
#[derive(Clone, Default)]
pub struct InMemoryLoyaltyService {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryLoyaltyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reservations that have been credited.
    pub async fn credited_count(&self) -> usize {
        self.ledger.read().await.credited.len()
    }
}

#[async_trait]
impl LoyaltyService for InMemoryLoyaltyService {
    async fn credit_completed(&self, reservation: &Reservation) -> Result<(), LoyaltyError> {
        if reservation.state() != ReservationState::Completed {
            return Ok(());
        }

        let mut ledger = self.ledger.write().await;
        if !ledger.credited.insert(reservation.id()) {
            return Ok(());
        }

        let account = ledger.accounts.entry(reservation.user_id()).or_default();
        account.0 += POINTS_PER_COMPLETED_RESERVATION;
        account.1 += POINTS_PER_COMPLETED_RESERVATION;
        Ok(())
    }

    async fn points_for_user(&self, user_id: UserId) -> Result<(i64, i64), LoyaltyError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.accounts.get(&user_id).copied().unwrap_or((0, 0)))
    }
}
