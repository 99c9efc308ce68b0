//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::state::AppState;
use crate::ws;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/devices", get(api::list_devices))
        .route("/devices/discover", post(api::discover_devices))
        .route(
            "/devices/{id}",
            get(api::get_device).delete(api::remove_device),
        )
        .route("/devices/{id}/pair", post(api::pair_device))
        .route("/devices/{id}/unpair", post(api::unpair_device))
        .route("/devices/{id}/characteristics", get(api::get_characteristics))
        .route(
            "/devices/{id}/characteristics/{characteristic}",
            get(api::get_characteristic).put(api::set_characteristic),
        )
        .route("/devices/{id}/command", post(api::send_command))
        .route("/devices/{id}/services", get(api::get_services))
        // WebSocket for real-time updates
        .route("/ws", get(ws::websocket_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
