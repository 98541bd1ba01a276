//! Wishlist Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use shared::ProductRef;
use shared::models::WishlistEntry;

use crate::api::Shopper;
use crate::core::ServerState;
use crate::db::repository::WishlistRepository;
use crate::utils::{AppError, AppResult};

/// GET /api/wishlist - 当前购物者的心愿单
pub async fn list(
    State(state): State<ServerState>,
    shopper: Shopper,
) -> AppResult<Json<Vec<WishlistEntry>>> {
    let repo = WishlistRepository::new(state.db.clone());
    let entries = repo
        .find_by_owner(&shopper.owner_key())
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_ref: ProductRef,
}

/// POST /api/wishlist - 收藏商品 (重复收藏幂等)
pub async fn add(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<AddRequest>,
) -> AppResult<Json<WishlistEntry>> {
    let repo = WishlistRepository::new(state.db.clone());
    let entry = repo
        .add(&shopper.owner_key(), payload.product_ref)
        .await
        .map_err(AppError::from_repo)?;
    Ok(Json(entry))
}

/// DELETE /api/wishlist/{id} - 取消收藏
pub async fn remove(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = WishlistRepository::new(state.db.clone());
    repo.remove(&shopper.owner_key(), &id)
        .await
        .map_err(AppError::from_repo)?;
    Ok(Json(true))
}
