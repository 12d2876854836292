//! User notification endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::UserId;
use reservation_store::{
    Notification, NotificationStore, ReservationStore, RestaurantDirectory,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::reservations::AppState;

#[derive(Deserialize, Default)]
pub struct NotificationParams {
    /// When true, only unread notifications are returned.
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Deserialize)]
pub struct MarkReadRequest {
    pub user_id: UserId,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub reservation_id: Option<String>,
    pub is_read: bool,
    pub sent_at: String,
    pub read_at: Option<String>,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.to_string(),
            user_id: n.user_id.to_string(),
            kind: n.kind.to_string(),
            title: n.title.clone(),
            message: n.message.clone(),
            reservation_id: n.reservation_id.map(|r| r.to_string()),
            is_read: n.is_read,
            sent_at: n.sent_at.to_rfc3339(),
            read_at: n.read_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /users/:user_id/notifications — list a user's notifications,
/// newest first.
#[tracing::instrument(skip(state, params))]
pub async fn for_user<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let user_id = parse_user_id(&user_id)?;
    let notifications = state.store.for_user(user_id, params.unread_only).await?;
    let responses = notifications.iter().map(NotificationResponse::from).collect();
    Ok(Json(responses))
}

/// POST /notifications/:id/read — mark a notification as read.
///
/// Marking is scoped to the owning user; a mismatched `user_id` is treated
/// as not found so notification ids cannot be probed.
#[tracing::instrument(skip(state, req))]
pub async fn mark_read<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<NotificationResponse>, ApiError>
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let notification_id = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;

    let now = state.clock.now();
    let notification = state
        .store
        .mark_read(notification_id, req.user_id, now)
        .await?;
    Ok(Json(NotificationResponse::from(&notification)))
}

fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}
