//! Discount Code Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use shared::models::{DiscountCode, DiscountCodeCreate, DiscountCodeUpdate};

use crate::checkout::totals;
use crate::core::ServerState;
use crate::db::repository::DiscountRepository;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};
use crate::utils::{AppError, AppResult};

const RESOURCE_DISCOUNT: &str = "discount_code";

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    /// 当前小计，用于 min_subtotal 校验与金额预览
    pub subtotal: f64,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub code: DiscountCode,
    /// 以该小计计算出的折扣金额
    pub discount: f64,
}

/// POST /api/discounts/validate - 校验折扣码
pub async fn validate(
    State(state): State<ServerState>,
    Json(payload): Json<ValidateRequest>,
) -> AppResult<Json<ValidateResponse>> {
    validate_required_text(&payload.code, "code", MAX_NAME_LEN)?;

    let repo = DiscountRepository::new(state.db.clone());
    let code = repo
        .find_by_code(&payload.code)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Discount code {}", payload.code)))?;

    if let Some(reason) =
        totals::discount_rejection(&code, payload.subtotal, chrono::Utc::now().timestamp_millis())
    {
        return Err(AppError::business_rule(reason));
    }

    let discount = totals::preview_discount(payload.subtotal, &code);
    Ok(Json(ValidateResponse { code, discount }))
}

/// GET /api/discounts - 获取所有折扣码
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<DiscountCode>>> {
    let repo = DiscountRepository::new(state.db.clone());
    let codes = repo
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(codes))
}

/// POST /api/discounts - 创建折扣码
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DiscountCodeCreate>,
) -> AppResult<Json<DiscountCode>> {
    validate_required_text(&payload.code, "code", MAX_NAME_LEN)?;
    if payload.value <= 0.0 {
        return Err(AppError::validation("value must be positive"));
    }

    let repo = DiscountRepository::new(state.db.clone());
    let code = repo.create(payload).await.map_err(AppError::from_repo)?;

    // 广播同步通知
    let id = code.id.clone().unwrap_or_default();
    state
        .broadcast_sync(RESOURCE_DISCOUNT, "created", &id, Some(&code))
        .await;

    Ok(Json(code))
}

/// PUT /api/discounts/{id} - 更新折扣码
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<DiscountCodeUpdate>,
) -> AppResult<Json<DiscountCode>> {
    let repo = DiscountRepository::new(state.db.clone());
    let code = repo.update(&id, payload).await.map_err(AppError::from_repo)?;

    // 广播同步通知
    let full_id = code.id.clone().unwrap_or_else(|| id.clone());
    state
        .broadcast_sync(RESOURCE_DISCOUNT, "updated", &full_id, Some(&code))
        .await;

    Ok(Json(code))
}
