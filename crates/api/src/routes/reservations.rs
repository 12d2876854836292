//! Reservation booking and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{NaiveDate, NaiveTime};
use common::{ReservationId, RestaurantId, TableId, UserId};
use domain::{ChangedBy, Clock, HistoryEntry, Reservation, ReservationEdit};
use lifecycle::{CreateReservation, ReservationLifecycle};
use reservation_store::{
    NotificationStore, ReservationQuery, ReservationStore, RestaurantDirectory,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub lifecycle: ReservationLifecycle<S>,
    pub store: Arc<S>,
    pub clock: Arc<dyn Clock>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub table_id: TableId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub guests: u32,
    pub special_requests: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ActorRequest {
    /// User performing the action; absent means the system did it.
    pub actor_id: Option<UserId>,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
    pub actor_id: Option<UserId>,
}

#[derive(Deserialize)]
pub struct EditReservationRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub guests: u32,
    pub special_requests: Option<String>,
    pub actor_id: Option<UserId>,
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub restaurant_id: Option<RestaurantId>,
    pub user_id: Option<UserId>,
    pub table_id: Option<TableId>,
    pub state: Option<String>,
    pub date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    pub table_id: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub guests: u32,
    pub state: String,
    pub version: i64,
    pub special_requests: Option<String>,
    pub created_at: String,
    pub confirmed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl From<&Reservation> for ReservationResponse {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id().to_string(),
            user_id: r.user_id().to_string(),
            restaurant_id: r.restaurant_id().to_string(),
            table_id: r.table_id().map(|t| t.to_string()),
            date: r.date(),
            time: r.time(),
            duration_minutes: r.duration_minutes(),
            guests: r.guests(),
            state: r.state().to_string(),
            version: r.version(),
            special_requests: r.special_requests().map(String::from),
            created_at: r.created_at().to_rfc3339(),
            confirmed_at: r.confirmed_at().map(|t| t.to_rfc3339()),
            cancelled_at: r.cancelled_at().map(|t| t.to_rfc3339()),
            cancellation_reason: r.cancellation_reason().map(String::from),
        }
    }
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub id: String,
    pub from_state: Option<String>,
    pub to_state: String,
    pub changed_by: String,
    pub note: Option<String>,
    pub at: String,
}

impl From<&HistoryEntry> for HistoryEntryResponse {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            from_state: entry.from_state.map(|s| s.to_string()),
            to_state: entry.to_state.to_string(),
            changed_by: entry.changed_by.to_string(),
            note: entry.note.clone(),
            at: entry.at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /reservations — request a new booking.
#[tracing::instrument(skip(state, req))]
pub async fn create<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(axum::http::StatusCode, Json<ReservationResponse>), ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let cmd = CreateReservation {
        reservation_id: ReservationId::new(),
        user_id: req.user_id,
        restaurant_id: req.restaurant_id,
        table_id: req.table_id,
        date: req.date,
        time: req.time,
        duration_minutes: req.duration_minutes,
        guests: req.guests,
        special_requests: req.special_requests,
    };

    let reservation = state.lifecycle.create(cmd).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ReservationResponse::from(&reservation)),
    ))
}

/// GET /reservations — list reservations matching the query parameters.
#[tracing::instrument(skip(state, params))]
pub async fn list<S>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let mut query = ReservationQuery {
        restaurant_id: params.restaurant_id,
        user_id: params.user_id,
        table_id: params.table_id,
        state: None,
        date: params.date,
        limit: params.limit,
        offset: params.offset,
    };
    if let Some(raw) = params.state {
        let parsed = raw
            .parse()
            .map_err(|e: String| ApiError::BadRequest(format!("Invalid state filter: {e}")))?;
        query.state = Some(parsed);
    }

    let reservations = state.lifecycle.list(query).await?;
    let responses = reservations.iter().map(ReservationResponse::from).collect();
    Ok(Json(responses))
}

/// GET /reservations/:id — load a reservation by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let reservation_id = parse_reservation_id(&id)?;
    let reservation = state.lifecycle.get(reservation_id).await?;
    Ok(Json(ReservationResponse::from(&reservation)))
}

/// POST /reservations/:id/confirm — confirm a requested booking.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Option<Json<ActorRequest>>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let reservation_id = parse_reservation_id(&id)?;
    let changed_by = changed_by(req.map(|Json(r)| r.actor_id).unwrap_or_default());

    let reservation = state.lifecycle.confirm(reservation_id, changed_by).await?;
    Ok(Json(ReservationResponse::from(&reservation)))
}

/// POST /reservations/:id/cancel — cancel a booking with an optional reason.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Option<Json<CancelRequest>>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let reservation_id = parse_reservation_id(&id)?;
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let changed_by = changed_by(req.actor_id);

    let reservation = state
        .lifecycle
        .cancel(reservation_id, req.reason, changed_by)
        .await?;
    Ok(Json(ReservationResponse::from(&reservation)))
}

/// POST /reservations/:id/complete — mark a confirmed booking as completed.
#[tracing::instrument(skip(state, req))]
pub async fn complete<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Option<Json<ActorRequest>>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let reservation_id = parse_reservation_id(&id)?;
    let changed_by = changed_by(req.map(|Json(r)| r.actor_id).unwrap_or_default());

    let reservation = state.lifecycle.complete(reservation_id, changed_by).await?;
    Ok(Json(ReservationResponse::from(&reservation)))
}

/// PUT /reservations/:id — edit booking details while still requested.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<EditReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let reservation_id = parse_reservation_id(&id)?;
    let changed_by = changed_by(req.actor_id);

    let changes = ReservationEdit {
        date: req.date,
        time: req.time,
        duration_minutes: req.duration_minutes,
        guests: req.guests,
        special_requests: req.special_requests,
    };

    let reservation = state
        .lifecycle
        .edit(reservation_id, changes, changed_by)
        .await?;
    Ok(Json(ReservationResponse::from(&reservation)))
}

/// GET /reservations/:id/history — audit trail for a reservation.
#[tracing::instrument(skip(state))]
pub async fn history<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let reservation_id = parse_reservation_id(&id)?;
    let entries = state.lifecycle.history(reservation_id).await?;
    let responses = entries.iter().map(HistoryEntryResponse::from).collect();
    Ok(Json(responses))
}

fn changed_by(actor_id: Option<UserId>) -> ChangedBy {
    match actor_id {
        Some(user_id) => ChangedBy::User(user_id),
        None => ChangedBy::System,
    }
}

fn parse_reservation_id(id: &str) -> Result<ReservationId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(ReservationId::from_uuid(uuid))
}
