//! Menu Item Management API

mod handler;

use axum::{
    Router,
    routing::get,
};

use crate::core::ServerState;

/// Menu item router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/menu-items", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/by-category/{category_id}", get(handler::list_by_category))
        .route("/{id}", get(handler::get_by_id).put(handler::update).delete(handler::delete))
}
