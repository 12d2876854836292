use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{ReservationId, RestaurantId, TableId, UserId};
use domain::{
    ChangedBy, HistoryEntry, Reservation, ReservationState, RestaurantInfo, TableInfo,
};

use crate::{
    Notification, NotificationKind, ReservationQuery, Result, StoreError,
    store::{NotificationStore, ReservationStore, RestaurantDirectory},
};

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

const RESERVATION_COLUMNS: &str = "id, user_id, restaurant_id, table_id, date, time, \
     duration_minutes, guests, state, version, special_requests, created_at, confirmed_at, \
     cancelled_at, cancellation_reason";

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn parse_state(raw: &str) -> Result<ReservationState> {
        raw.parse().map_err(|msg: String| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(msg)))
        })
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let state = Self::parse_state(row.try_get::<String, _>("state")?.as_str())?;
        Ok(Reservation::from_parts(
            ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            row.try_get::<Option<Uuid>, _>("table_id")?
                .map(TableId::from_uuid),
            row.try_get("date")?,
            row.try_get("time")?,
            row.try_get("duration_minutes")?,
            row.try_get::<i32, _>("guests")? as u32,
            state,
            row.try_get("version")?,
            row.try_get("special_requests")?,
            row.try_get("created_at")?,
            row.try_get("confirmed_at")?,
            row.try_get("cancelled_at")?,
            row.try_get("cancellation_reason")?,
        ))
    }

    fn row_to_history(row: PgRow) -> Result<HistoryEntry> {
        let from_state = row
            .try_get::<Option<String>, _>("from_state")?
            .map(|s| Self::parse_state(&s))
            .transpose()?;
        let to_state = Self::parse_state(row.try_get::<String, _>("to_state")?.as_str())?;
        let changed_by = match row.try_get::<Option<Uuid>, _>("changed_by_user")? {
            Some(id) => ChangedBy::User(UserId::from_uuid(id)),
            None => ChangedBy::System,
        };

        Ok(HistoryEntry {
            id: row.try_get("id")?,
            reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
            from_state,
            to_state,
            changed_by,
            note: row.try_get("note")?,
            at: row.try_get("at")?,
        })
    }

    fn row_to_notification(row: PgRow) -> Result<Notification> {
        let kind: NotificationKind = row
            .try_get::<String, _>("kind")?
            .parse()
            .map_err(|msg: String| {
                StoreError::Serialization(serde_json::Error::io(std::io::Error::other(msg)))
            })?;

        Ok(Notification {
            id: row.try_get("id")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            kind,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            reservation_id: row
                .try_get::<Option<Uuid>, _>("reservation_id")?
                .map(ReservationId::from_uuid),
            is_read: row.try_get("is_read")?,
            sent_at: row.try_get("sent_at")?,
            read_at: row.try_get("read_at")?,
        })
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn insert(&self, reservation: &Reservation, now: DateTime<Utc>) -> Result<()> {
        let start = reservation.start_time();
        let end = reservation.end_time();

        let mut tx = self.pool.begin().await?;

        // Re-check conflicts inside the transaction; validation ran on a
        // snapshot that may be stale by now.
        if let Some(table_id) = reservation.table_id() {
            let conflict = sqlx::query(
                r#"
                SELECT start_at, end_at FROM reservations
                WHERE table_id = $1
                  AND id <> $2
                  AND state NOT IN ('Cancelled', 'Expired')
                  AND end_at > $3
                  AND start_at < $4 AND end_at > $5
                LIMIT 1
                "#,
            )
            .bind(table_id.as_uuid())
            .bind(reservation.id().as_uuid())
            .bind(now)
            .bind(end)
            .bind(start)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(row) = conflict {
                return Err(StoreError::TableConflict {
                    start: row.try_get("start_at")?,
                    end: row.try_get("end_at")?,
                });
            }
        }

        let user_conflict = sqlx::query(
            r#"
            SELECT start_at, end_at FROM reservations
            WHERE user_id = $1
              AND restaurant_id <> $2
              AND id <> $3
              AND state NOT IN ('Cancelled', 'Expired')
              AND end_at > $4
              AND start_at < $5 AND end_at > $6
            LIMIT 1
            "#,
        )
        .bind(reservation.user_id().as_uuid())
        .bind(reservation.restaurant_id().as_uuid())
        .bind(reservation.id().as_uuid())
        .bind(now)
        .bind(end)
        .bind(start)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = user_conflict {
            return Err(StoreError::UserConflict {
                start: row.try_get("start_at")?,
                end: row.try_get("end_at")?,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, user_id, restaurant_id, table_id, date, time, duration_minutes, guests,
                 state, version, special_requests, created_at, confirmed_at, cancelled_at,
                 cancellation_reason, start_at, end_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.user_id().as_uuid())
        .bind(reservation.restaurant_id().as_uuid())
        .bind(reservation.table_id().map(|t| t.as_uuid()))
        .bind(reservation.date())
        .bind(reservation.time())
        .bind(reservation.duration_minutes())
        .bind(reservation.guests() as i32)
        .bind(reservation.state().as_str())
        .bind(reservation.version())
        .bind(reservation.special_requests())
        .bind(reservation.created_at())
        .bind(reservation.confirmed_at())
        .bind(reservation.cancelled_at())
        .bind(reservation.cancellation_reason())
        .bind(start)
        .bind(end)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, reservation: &Reservation) -> Result<i64> {
        let new_version = reservation.version() + 1;

        let updated = sqlx::query(
            r#"
            UPDATE reservations
            SET date = $1, time = $2, duration_minutes = $3, guests = $4, state = $5,
                version = $6, special_requests = $7, confirmed_at = $8, cancelled_at = $9,
                cancellation_reason = $10, start_at = $11, end_at = $12
            WHERE id = $13 AND version = $14
            "#,
        )
        .bind(reservation.date())
        .bind(reservation.time())
        .bind(reservation.duration_minutes())
        .bind(reservation.guests() as i32)
        .bind(reservation.state().as_str())
        .bind(new_version)
        .bind(reservation.special_requests())
        .bind(reservation.confirmed_at())
        .bind(reservation.cancelled_at())
        .bind(reservation.cancellation_reason())
        .bind(reservation.start_time())
        .bind(reservation.end_time())
        .bind(reservation.id().as_uuid())
        .bind(reservation.version())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Distinguish a missing row from a stale version.
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM reservations WHERE id = $1")
                    .bind(reservation.id().as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;

            return match actual {
                Some(actual) => Err(StoreError::VersionConflict {
                    reservation_id: reservation.id(),
                    expected: reservation.version(),
                    actual,
                }),
                None => Err(StoreError::ReservationNotFound(reservation.id())),
            };
        }

        Ok(new_version)
    }

    async fn get(&self, id: ReservationId) -> Result<Reservation> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_reservation(row),
            None => Err(StoreError::ReservationNotFound(id)),
        }
    }

    async fn query(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        let mut sql =
            format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE 1=1");
        let mut param_count = 0;

        if query.restaurant_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND restaurant_id = ${param_count}"));
        }
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.table_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND table_id = ${param_count}"));
        }
        if query.state.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND state = ${param_count}"));
        }
        if query.date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND date = ${param_count}"));
        }

        sql.push_str(" ORDER BY date ASC, time ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(id) = query.restaurant_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(id) = query.user_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(id) = query.table_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(state) = query.state {
            sqlx_query = sqlx_query.bind(state.as_str());
        }
        if let Some(date) = query.date {
            sqlx_query = sqlx_query.bind(date);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn for_table_on_dates(
        &self,
        table_id: TableId,
        dates: &[NaiveDate],
    ) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE table_id = $1 AND date = ANY($2)
            ORDER BY date ASC, time ASC
            "#
        ))
        .bind(table_id.as_uuid())
        .bind(dates)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn for_user_on_dates_excluding(
        &self,
        user_id: UserId,
        dates: &[NaiveDate],
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE user_id = $1 AND restaurant_id <> $2 AND date = ANY($3)
            ORDER BY date ASC, time ASC
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(restaurant_id.as_uuid())
        .bind(dates)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn due_for_auto_advance(
        &self,
        state: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE state = $1 AND end_at <= $2
            ORDER BY end_at ASC
            "#
        ))
        .bind(state.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        let changed_by_user = match entry.changed_by {
            ChangedBy::User(id) => Some(id.as_uuid()),
            ChangedBy::System => None,
        };

        sqlx::query(
            r#"
            INSERT INTO reservation_history
                (id, reservation_id, from_state, to_state, changed_by_user, note, at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.reservation_id.as_uuid())
        .bind(entry.from_state.map(|s| s.as_str()))
        .bind(entry.to_state.as_str())
        .bind(changed_by_user)
        .bind(entry.note.as_deref())
        .bind(entry.at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn history_for(&self, reservation_id: ReservationId) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reservation_id, from_state, to_state, changed_by_user, note, at
            FROM reservation_history
            WHERE reservation_id = $1
            ORDER BY at ASC
            "#,
        )
        .bind(reservation_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn add(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, kind, title, message, reservation_id, is_read, sent_at, read_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.reservation_id.map(|r| r.as_uuid()))
        .bind(notification.is_read)
        .bind(notification.sent_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<Notification>> {
        let mut sql = String::from(
            "SELECT id, user_id, kind, title, message, reservation_id, is_read, sent_at, read_at \
             FROM notifications WHERE user_id = $1",
        );
        if unread_only {
            sql.push_str(" AND is_read = FALSE");
        }
        sql.push_str(" ORDER BY sent_at DESC");

        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let row = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, $3)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, kind, title, message, reservation_id, is_read, sent_at, read_at
            "#,
        )
        .bind(id)
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_notification(row),
            None => Err(StoreError::NotificationNotFound(id)),
        }
    }
}

#[async_trait]
impl RestaurantDirectory for PostgresStore {
    async fn restaurant(&self, id: RestaurantId) -> Result<RestaurantInfo> {
        let row = sqlx::query(
            "SELECT id, name, owner_id, open_time, close_time, is_active \
             FROM restaurants WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::RestaurantNotFound(id))?;
        Ok(RestaurantInfo {
            id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            open_time: row.try_get("open_time")?,
            close_time: row.try_get("close_time")?,
            is_active: row.try_get("is_active")?,
        })
    }

    async fn table(&self, id: TableId) -> Result<TableInfo> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, capacity, is_active \
             FROM restaurant_tables WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::TableNotFound(id))?;
        Ok(TableInfo {
            id: TableId::from_uuid(row.try_get::<Uuid, _>("id")?),
            restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            capacity: row.try_get::<i32, _>("capacity")? as u32,
            is_active: row.try_get("is_active")?,
        })
    }
}
