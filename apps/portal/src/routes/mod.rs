pub mod health;
pub mod proxy;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session API
        .route(
            "/api/session",
            get(handlers::handle_get_session).post(handlers::handle_update_session),
        )
        // Everything else under /api belongs to the assessment backend
        .route(
            "/api/*path",
            any(proxy::handle_proxy).layer(DefaultBodyLimit::max(proxy::PROXY_BODY_LIMIT)),
        )
        .with_state(state)
}
