//! Route definitions and router construction.
//!
//! Two surfaces, mirroring the daemon's two listen ports: the client
//! surface node components submit fetch requests to, and the admin surface
//! agents register themselves on.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Routes for the client-facing surface.
pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/v1/content", post(handlers::client::submit))
        .route("/v1/content/{id}", get(handlers::client::status))
}

/// Routes for the admin (agent registration) surface.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/ping", get(handlers::ping)).route(
        "/v1/agents/{id}",
        post(handlers::admin::register).delete(handlers::admin::unregister),
    )
}
