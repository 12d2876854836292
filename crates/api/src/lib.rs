//! HTTP API server with observability for the reservation system.
//!
//! Provides REST endpoints for booking, lifecycle transitions and user
//! notifications, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{Clock, SystemClock};
use lifecycle::{AutoAdvance, InMemoryLoyaltyService, ReservationLifecycle};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{LoggingPublisher, NotificationDispatcher};
use reservation_store::{
    InMemoryStore, NotificationStore, ReservationStore, RestaurantDirectory,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::reservations::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/reservations", post(routes::reservations::create::<S>))
        .route("/reservations", get(routes::reservations::list::<S>))
        .route("/reservations/{id}", get(routes::reservations::get::<S>))
        .route("/reservations/{id}", put(routes::reservations::edit::<S>))
        .route(
            "/reservations/{id}/confirm",
            post(routes::reservations::confirm::<S>),
        )
        .route(
            "/reservations/{id}/cancel",
            post(routes::reservations::cancel::<S>),
        )
        .route(
            "/reservations/{id}/complete",
            post(routes::reservations::complete::<S>),
        )
        .route(
            "/reservations/{id}/history",
            get(routes::reservations::history::<S>),
        )
        .route(
            "/users/{user_id}/notifications",
            get(routes::notifications::for_user::<S>),
        )
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the lifecycle service and auto-advance scheduler over a storage
/// backend.
pub fn create_state<S>(
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    auto_advance_interval: Duration,
) -> (Arc<AppState<S>>, Arc<AutoAdvance<S>>)
where
    S: ReservationStore + NotificationStore + RestaurantDirectory + 'static,
{
    let dispatcher =
        NotificationDispatcher::new(Arc::clone(&store), Arc::new(LoggingPublisher::new()));
    let lifecycle = ReservationLifecycle::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        Arc::new(InMemoryLoyaltyService::new()),
        dispatcher,
    );
    let scheduler = Arc::new(AutoAdvance::new(
        lifecycle.clone(),
        Arc::clone(&store),
        Arc::clone(&clock),
        auto_advance_interval,
    ));

    let state = Arc::new(AppState {
        lifecycle,
        store,
        clock,
    });

    (state, scheduler)
}

/// Creates the default application state over the in-memory store.
pub fn create_default_state(
    store: InMemoryStore,
) -> (Arc<AppState<InMemoryStore>>, Arc<AutoAdvance<InMemoryStore>>) {
    create_state(
        Arc::new(store),
        Arc::new(SystemClock),
        Duration::from_secs(60),
    )
}
