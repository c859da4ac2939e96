pub mod auth;
pub mod comments;
pub mod config;
pub mod email;
pub mod reminders;
pub mod shared;
pub mod store;
pub mod tests;
pub mod tickets;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::shared::state::AppState;

/// Assembles the full API surface over a prepared application state.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth::configure_auth_routes())
        .merge(tickets::configure_tickets_routes())
        .merge(comments::configure_comments_routes())
        .merge(reminders::configure_cron_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
