//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`menu`] - 菜单浏览 (公开)
//! - [`categories`] - 分类管理接口
//! - [`menu_items`] - 菜单项管理接口
//! - [`cart`] - 购物车接口
//! - [`addresses`] - 地址簿接口
//! - [`discounts`] - 折扣码接口
//! - [`checkout`] - 结账流程接口
//! - [`orders`] - 订单查询接口
//! - [`reservations`] - 预订接口
//! - [`reviews`] - 评价接口
//! - [`wishlist`] - 心愿单接口
//! - [`settings`] - 店铺设置接口

pub mod shopper;

pub mod health;
pub mod menu;

// Data models API
pub mod addresses;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod discounts;
pub mod menu_items;
pub mod orders;
pub mod reservations;
pub mod reviews;
pub mod settings;
pub mod wishlist;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
pub use shopper::Shopper;

use axum::Router;
use http::{HeaderName, HeaderValue};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Public storefront
        .merge(health::router())
        .merge(menu::router())
        .merge(settings::router())
        // Shopper-scoped
        .merge(cart::router())
        .merge(addresses::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(reservations::router())
        .merge(reviews::router())
        .merge(wishlist::router())
        // Management
        .merge(categories::router())
        .merge(menu_items::router())
        .merge(discounts::router())
}

/// Build a fully configured application with all middleware
pub fn build_app(_state: &ServerState) -> Router<ServerState> {
    build_router()
        // ========== Tower HTTP Middleware ==========
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Compression - Gzip compress responses
        .layer(CompressionLayer::new())
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // Request ID - Generate unique ID for each request
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
}
