//! Menu Browse API (public)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Menu router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/menu", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Full menu grouped by category
        .route("/", get(handler::browse))
        // Single item with rating summary
        .route("/items/{id}", get(handler::item_detail))
}
