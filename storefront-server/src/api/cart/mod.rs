//! Cart API
//!
//! 访客与登录用户同构：身份来自请求头，见 [`crate::api::Shopper`]。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Cart router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/cart", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Resolved cart view with totals
        .route("/", get(handler::view).delete(handler::clear))
        .route("/lines", post(handler::add_line))
        .route("/lines/{id}", put(handler::update_line).delete(handler::remove_line))
        // Merge a guest cart after login
        .route("/merge", post(handler::merge))
}
