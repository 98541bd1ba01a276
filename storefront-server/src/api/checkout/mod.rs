//! Checkout API
//!
//! 会话生命周期 + 报价 + 地址 + 折扣 + 下单 + 支付确认。
//! 回调、重定向返回与 webhook 三条支付结果路径都在这里收敛。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Checkout router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Session lifecycle (listener subscriptions bound to it)
        .route(
            "/session",
            post(handler::open_session)
                .get(handler::session_status)
                .delete(handler::close_session),
        )
        // Quote & inputs
        .route("/quote", get(handler::quote))
        .route("/address", post(handler::select_address))
        .route("/discount", post(handler::apply_discount).delete(handler::remove_discount))
        // Placement & payment
        .route("/place", post(handler::place))
        .route("/payment/confirm", post(handler::payment_confirm))
        .route("/payment/return", get(handler::payment_return))
        .route("/payment/retry", post(handler::payment_retry))
        // Processor webhook (signature-verified, idempotent)
        .route("/webhook", post(handler::webhook))
}
