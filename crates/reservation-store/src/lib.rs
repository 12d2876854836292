pub mod error;
pub mod memory;
pub mod notification;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use notification::{Notification, NotificationKind};
pub use postgres::PostgresStore;
pub use query::ReservationQuery;
pub use store::{NotificationStore, ReservationStore, RestaurantDirectory};
