use chrono::NaiveDate;

use common::{RestaurantId, TableId, UserId};
use domain::ReservationState;

/// Builder for reservation listing queries.
///
/// Results are always ordered by booking date and time, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ReservationQuery {
    /// Filter by restaurant.
    pub restaurant_id: Option<RestaurantId>,

    /// Filter by user.
    pub user_id: Option<UserId>,

    /// Filter by table.
    pub table_id: Option<TableId>,

    /// Filter by lifecycle state.
    pub state: Option<ReservationState>,

    /// Filter by booking date.
    pub date: Option<NaiveDate>,

    /// Maximum number of reservations to return.
    pub limit: Option<usize>,

    /// Number of reservations to skip.
    pub offset: Option<usize>,
}

impl ReservationQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a restaurant's reservations.
    pub fn for_restaurant(restaurant_id: RestaurantId) -> Self {
        Self {
            restaurant_id: Some(restaurant_id),
            ..Default::default()
        }
    }

    /// Creates a query for a user's reservations.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Filters by restaurant.
    pub fn restaurant_id(mut self, id: RestaurantId) -> Self {
        self.restaurant_id = Some(id);
        self
    }

    /// Filters by user.
    pub fn user_id(mut self, id: UserId) -> Self {
        self.user_id = Some(id);
        self
    }

    /// Filters by table.
    pub fn table_id(mut self, id: TableId) -> Self {
        self.table_id = Some(id);
        self
    }

    /// Filters by lifecycle state.
    pub fn state(mut self, state: ReservationState) -> Self {
        self.state = Some(state);
        self
    }

    /// Filters by booking date.
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Limits the number of reservations returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many reservations before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_for_restaurant() {
        let id = RestaurantId::new();
        let query = ReservationQuery::for_restaurant(id);
        assert_eq!(query.restaurant_id, Some(id));
        assert!(query.user_id.is_none());
    }

    #[test]
    fn test_query_builder_chain() {
        let restaurant_id = RestaurantId::new();
        let date = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let query = ReservationQuery::new()
            .restaurant_id(restaurant_id)
            .state(ReservationState::Requested)
            .date(date)
            .limit(50)
            .offset(10);

        assert_eq!(query.restaurant_id, Some(restaurant_id));
        assert_eq!(query.state, Some(ReservationState::Requested));
        assert_eq!(query.date, Some(date));
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.offset, Some(10));
    }
}
