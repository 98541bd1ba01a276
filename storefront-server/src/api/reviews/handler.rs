//! Review Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::{Review, ReviewCreate};

use crate::api::Shopper;
use crate::core::ServerState;
use crate::db::repository::{MenuItemRepository, ReviewRepository};
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult};

/// GET /api/reviews/item/{item_id} - 菜单项的评价列表
pub async fn list_by_item(
    State(state): State<ServerState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Vec<Review>>> {
    let repo = ReviewRepository::new(state.db.clone());
    let reviews = repo
        .find_by_item(&item_id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(reviews))
}

/// POST /api/reviews - 发表评价
pub async fn create(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<ReviewCreate>,
) -> AppResult<Json<Review>> {
    validate_optional_text(&payload.comment, "comment", MAX_NOTE_LEN)?;

    // 被评价的菜单项必须存在
    MenuItemRepository::new(state.db.clone())
        .find_by_id(&payload.menu_item)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Menu item {}", payload.menu_item)))?;

    let repo = ReviewRepository::new(state.db.clone());
    let review = repo
        .create(&shopper.owner_key(), payload)
        .await
        .map_err(AppError::from_repo)?;
    Ok(Json(review))
}
