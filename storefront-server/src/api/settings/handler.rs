//! Store Settings Handlers

use axum::{Json, extract::State};

use shared::models::{StoreSettings, StoreSettingsUpdate};

use crate::core::ServerState;
use crate::db::repository::SettingsRepository;
use crate::utils::{AppError, AppResult};

const RESOURCE_SETTINGS: &str = "store_settings";

/// GET /api/settings/checkout - 结账经济参数 (公开)
pub async fn checkout_settings(State(state): State<ServerState>) -> AppResult<Json<StoreSettings>> {
    let repo = SettingsRepository::new(state.db.clone());
    let settings = repo.get().await.map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(settings))
}

/// PUT /api/settings - 更新店铺设置
pub async fn update(
    State(state): State<ServerState>,
    Json(payload): Json<StoreSettingsUpdate>,
) -> AppResult<Json<StoreSettings>> {
    if let Some(fee) = payload.delivery_fee
        && fee < 0.0
    {
        return Err(AppError::validation("delivery_fee must not be negative"));
    }
    if let Some(rate) = payload.tax_rate_percent
        && !(0.0..=100.0).contains(&rate)
    {
        return Err(AppError::validation("tax_rate_percent must be within 0..=100"));
    }

    let repo = SettingsRepository::new(state.db.clone());
    let settings = repo
        .update(payload)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    // 广播同步通知
    state
        .broadcast_sync(RESOURCE_SETTINGS, "updated", "store_settings:main", Some(&settings))
        .await;

    Ok(Json(settings))
}
