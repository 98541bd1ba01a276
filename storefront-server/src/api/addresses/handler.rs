//! Address Book Handlers
//!
//! 地址簿的增删改查。注意这里的校验是针对地址簿条目的
//! (名称/长度)；结账时的字段级校验在 checkout::address。

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::{Address, AddressCreate, AddressUpdate};

use crate::api::Shopper;
use crate::core::ServerState;
use crate::db::repository::AddressRepository;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};

const RESOURCE_ADDRESS: &str = "address";

/// GET /api/addresses - 当前购物者的地址簿
pub async fn list(State(state): State<ServerState>, shopper: Shopper) -> AppResult<Json<Vec<Address>>> {
    let repo = AddressRepository::new(state.db.clone());
    let addresses = repo
        .find_by_owner(&shopper.owner_key())
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(addresses))
}

/// POST /api/addresses - 新建地址
pub async fn create(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<AddressCreate>,
) -> AppResult<Json<Address>> {
    validate_required_text(&payload.full_name, "full_name", MAX_NAME_LEN)?;
    validate_required_text(&payload.line1, "line1", MAX_ADDRESS_LEN)?;
    validate_required_text(&payload.city, "city", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&payload.region, "region", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&payload.postal_code, "postal_code", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&payload.country, "country", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    let repo = AddressRepository::new(state.db.clone());
    let address = repo
        .create(&shopper.owner_key(), payload)
        .await
        .map_err(AppError::from_repo)?;

    // 广播同步通知 (监听器按 data.owner 过滤)
    let id = address.id.clone().unwrap_or_default();
    state
        .broadcast_sync(RESOURCE_ADDRESS, "created", &id, Some(&address))
        .await;

    Ok(Json(address))
}

/// PUT /api/addresses/{id} - 更新地址
pub async fn update(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
    Json(payload): Json<AddressUpdate>,
) -> AppResult<Json<Address>> {
    validate_optional_text(&payload.full_name, "full_name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.line1, "line1", MAX_ADDRESS_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    let repo = AddressRepository::new(state.db.clone());
    let address = repo
        .update(&shopper.owner_key(), &id, payload)
        .await
        .map_err(AppError::from_repo)?;

    // 广播同步通知
    let full_id = address.id.clone().unwrap_or_else(|| id.clone());
    state
        .broadcast_sync(RESOURCE_ADDRESS, "updated", &full_id, Some(&address))
        .await;

    Ok(Json(address))
}

/// DELETE /api/addresses/{id} - 删除地址
pub async fn delete(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = AddressRepository::new(state.db.clone());
    repo.delete(&shopper.owner_key(), &id)
        .await
        .map_err(AppError::from_repo)?;

    // 广播同步通知：删除事件也带 owner，监听器才能过滤
    let data = serde_json::json!({ "owner": shopper.owner_key() });
    state
        .broadcast_sync(RESOURCE_ADDRESS, "deleted", &id, Some(&data))
        .await;

    Ok(Json(true))
}
