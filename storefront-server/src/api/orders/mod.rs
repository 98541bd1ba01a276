//! Order API Module
//!
//! Read-only access to placed orders. All mutations go through checkout.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Order history for the current shopper
        .route("/", get(handler::history))
        // Order detail
        .route("/{id}", get(handler::get_by_id))
}
