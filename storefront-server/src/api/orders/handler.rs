//! Order Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::Order;

use crate::api::Shopper;
use crate::core::ServerState;
use crate::db::repository::OrderRepository;
use crate::utils::{AppError, AppResult};

/// GET /api/orders - 当前购物者的订单历史
pub async fn history(State(state): State<ServerState>, shopper: Shopper) -> AppResult<Json<Vec<Order>>> {
    let repo = OrderRepository::new(state.db.clone());
    let orders = repo
        .find_by_owner(&shopper.owner_key())
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(orders))
}

/// GET /api/orders/{id} - 订单详情 (只允许本人)
pub async fn get_by_id(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let repo = OrderRepository::new(state.db.clone());
    let order = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Order {}", id)))?;

    if order.owner.as_deref() != Some(shopper.owner_key().as_str()) {
        // 不泄露他人订单的存在
        return Err(AppError::not_found(format!("Order {}", id)));
    }

    Ok(Json(order))
}
