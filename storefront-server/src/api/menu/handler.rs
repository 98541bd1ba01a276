//! Menu Browse Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use shared::models::{Category, MenuItem, RatingSummary};

use crate::core::ServerState;
use crate::db::repository::{CategoryRepository, MenuItemRepository, ReviewRepository};
use crate::utils::{AppError, AppResult};

/// 菜单分区：分类 + 分类下的可售菜单项
#[derive(Debug, Serialize)]
pub struct MenuSection {
    pub category: Category,
    pub items: Vec<MenuItem>,
}

/// 菜单项详情：条目 + 评分汇总
#[derive(Debug, Serialize)]
pub struct MenuItemDetail {
    #[serde(flatten)]
    pub item: MenuItem,
    pub rating: RatingSummary,
}

/// GET /api/menu - 按分类分组的完整菜单
pub async fn browse(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuSection>>> {
    let categories = CategoryRepository::new(state.db.clone())
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    let items = MenuItemRepository::new(state.db.clone())
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let sections = categories
        .into_iter()
        .map(|category| {
            let category_id = category.id.clone().unwrap_or_default();
            let items = items
                .iter()
                .filter(|i| i.category == category_id)
                .cloned()
                .collect();
            MenuSection { category, items }
        })
        .collect();

    Ok(Json(sections))
}

/// GET /api/menu/items/{id} - 单个菜单项 (含评分)
pub async fn item_detail(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<MenuItemDetail>> {
    let item = MenuItemRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Menu item {}", id)))?;

    let rating = ReviewRepository::new(state.db.clone())
        .rating_summary(item.id.as_deref().unwrap_or(&id))
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(MenuItemDetail { item, rating }))
}
