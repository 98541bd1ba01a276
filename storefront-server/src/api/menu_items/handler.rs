//! Menu Item Management Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};

use crate::core::ServerState;
use crate::db::repository::MenuItemRepository;
use crate::utils::validation::{MAX_NAME_LEN, MAX_NOTE_LEN, validate_optional_text, validate_required_text};
use crate::utils::{AppError, AppResult};

const RESOURCE_MENU_ITEM: &str = "menu_item";

/// GET /api/menu-items - 获取所有菜单项
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuItem>>> {
    let repo = MenuItemRepository::new(state.db.clone());
    let items = repo
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(items))
}

/// GET /api/menu-items/by-category/{category_id} - 按分类获取菜单项
pub async fn list_by_category(
    State(state): State<ServerState>,
    Path(category_id): Path<String>,
) -> AppResult<Json<Vec<MenuItem>>> {
    let repo = MenuItemRepository::new(state.db.clone());
    let items = repo
        .find_by_category(&category_id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(items))
}

/// GET /api/menu-items/{id} - 获取单个菜单项
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<MenuItem>> {
    let repo = MenuItemRepository::new(state.db.clone());
    let item = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Menu item {}", id)))?;
    Ok(Json(item))
}

/// POST /api/menu-items - 创建菜单项
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<MenuItemCreate>,
) -> AppResult<Json<MenuItem>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;

    let repo = MenuItemRepository::new(state.db.clone());
    let item = repo.create(payload).await.map_err(AppError::from_repo)?;

    // 广播同步通知
    let id = item.id.clone().unwrap_or_default();
    state
        .broadcast_sync(RESOURCE_MENU_ITEM, "created", &id, Some(&item))
        .await;

    Ok(Json(item))
}

/// PUT /api/menu-items/{id} - 更新菜单项
///
/// 价格/可售性变更会经 broadcast_sync 推给打开结账的会话。
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<MenuItemUpdate>,
) -> AppResult<Json<MenuItem>> {
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;

    let repo = MenuItemRepository::new(state.db.clone());
    let item = repo.update(&id, payload).await.map_err(AppError::from_repo)?;

    // 广播同步通知
    let full_id = item.id.clone().unwrap_or_else(|| id.clone());
    state
        .broadcast_sync(RESOURCE_MENU_ITEM, "updated", &full_id, Some(&item))
        .await;

    Ok(Json(item))
}

/// DELETE /api/menu-items/{id} - 删除菜单项
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = MenuItemRepository::new(state.db.clone());
    repo.delete(&id).await.map_err(AppError::from_repo)?;

    // 广播同步通知
    state
        .broadcast_sync::<()>(RESOURCE_MENU_ITEM, "deleted", &id, None)
        .await;

    Ok(Json(true))
}
