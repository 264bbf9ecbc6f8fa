//! Readiness endpoint
//!
//! 200 iff the broker connection, the broker channel and the database all
//! answer their probes. A failed probe returns 503 and schedules a
//! reconnect in the background, so the next probe can come back healthy.

use axum::extract::State;
use axum::http::StatusCode;

use crate::api::server::ApiState;

#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Broker and database are reachable"),
        (status = 503, description = "A dependency failed its probe")
    )
)]
pub async fn ready(State(state): State<ApiState>) -> StatusCode {
    let mut healthy = true;

    if !state.broker.connection_ok().await || !state.broker.channel_ok().await {
        tracing::warn!("Readiness probe: broker unhealthy, scheduling reconnect");
        healthy = false;
        let broker = state.broker.clone();
        tokio::spawn(async move {
            if let Err(e) = broker.ensure_connected().await {
                tracing::error!(error = %e, "Broker reconnect failed");
            }
        });
    }

    if state.store.ping().await.is_err() {
        tracing::warn!("Readiness probe: database unhealthy, scheduling reconnect");
        healthy = false;
        let store = state.store.clone();
        tokio::spawn(async move {
            store.check_and_reconnect().await;
        });
    }

    if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
