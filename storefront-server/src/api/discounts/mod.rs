//! Discount Code API

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Discount router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/discounts", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Storefront: validate a code against a subtotal
        .route("/validate", post(handler::validate))
        // Management
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", put(handler::update))
}
