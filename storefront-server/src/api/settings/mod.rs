//! Store Settings API

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

/// Settings router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/settings", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Storefront: checkout economics (fee, threshold, tax, currency)
        .route("/checkout", get(handler::checkout_settings))
        // Management
        .route("/", put(handler::update))
}
