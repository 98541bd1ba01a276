//! Cart Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use shared::ShopperRef;
use shared::checkout::{OrderTotals, ResolvedProduct};
use shared::models::{CartLine, CartLineCreate, CartLineUpdate, CartSnapshot};

use crate::api::Shopper;
use crate::checkout::resolver::{ResolutionCache, resolve_lines};
use crate::checkout::{Catalog, totals};
use crate::core::ServerState;
use crate::db::repository::{CartRepository, SettingsRepository};
use crate::utils::{AppError, AppResult};

/// 购物车视图：原始行 + 解析视图 + 总价
#[derive(Debug, serde::Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub resolved: Vec<ResolvedProduct>,
    pub totals: OrderTotals,
}

async fn build_view(state: &ServerState, owner_key: &str) -> AppResult<CartView> {
    let lines = CartRepository::new(state.db.clone())
        .find_by_owner(owner_key)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let catalog = Catalog::new(state.db.clone());
    let cache = ResolutionCache::new();
    let resolved = resolve_lines(&catalog, &lines, &cache).await;

    let settings = SettingsRepository::new(state.db.clone())
        .get()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let priced: Vec<(&ResolvedProduct, i32)> = resolved
        .iter()
        .zip(lines.iter().map(|l| l.quantity))
        .collect();
    let cart_totals = totals::calculate(&priced, &settings, None);

    Ok(CartView {
        lines,
        resolved,
        totals: cart_totals,
    })
}

/// GET /api/cart - 解析后的购物车视图
pub async fn view(State(state): State<ServerState>, shopper: Shopper) -> AppResult<Json<CartView>> {
    Ok(Json(build_view(&state, &shopper.owner_key()).await?))
}

/// POST /api/cart/lines - 加购
///
/// 加购瞬间捕获内嵌快照与价格，权威记录之后被删除时
/// 结账仍可按快照成交。
pub async fn add_line(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<CartLineCreate>,
) -> AppResult<Json<CartView>> {
    if payload.quantity < 1 {
        return Err(AppError::validation("quantity must be >= 1"));
    }

    // 解析一次以捕获快照；解析失败 (商品不存在) 时不带快照加入
    let catalog = Catalog::new(state.db.clone());
    let cache = ResolutionCache::new();
    let probe = CartLine {
        id: None,
        owner: shopper.owner_key(),
        product_ref: payload.product_ref.clone(),
        quantity: payload.quantity,
        selection: payload.selection.clone(),
        price_at_add: None,
        snapshot: None,
        added_at: 0,
    };
    let resolved = resolve_lines(&catalog, &[probe], &cache).await;
    let (price_at_add, snapshot) = match resolved.first() {
        Some(r) if r.source != shared::checkout::ResolvedSource::Placeholder => (
            Some(r.current_price),
            Some(CartSnapshot {
                name: r.name.clone(),
                price: r.current_price,
                image: r.image.clone(),
                variant_name: r.variant_name.clone(),
            }),
        ),
        _ => (None, None),
    };

    CartRepository::new(state.db.clone())
        .add_line(
            &shopper.owner_key(),
            payload.product_ref,
            payload.quantity,
            payload.selection,
            price_at_add,
            snapshot,
        )
        .await
        .map_err(AppError::from_repo)?;

    Ok(Json(build_view(&state, &shopper.owner_key()).await?))
}

/// PUT /api/cart/lines/{id} - 改量
pub async fn update_line(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
    Json(payload): Json<CartLineUpdate>,
) -> AppResult<Json<CartView>> {
    CartRepository::new(state.db.clone())
        .update_quantity(&shopper.owner_key(), &id, payload.quantity)
        .await
        .map_err(AppError::from_repo)?;

    Ok(Json(build_view(&state, &shopper.owner_key()).await?))
}

/// DELETE /api/cart/lines/{id} - 移除一行
pub async fn remove_line(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> AppResult<Json<CartView>> {
    CartRepository::new(state.db.clone())
        .remove_line(&shopper.owner_key(), &id)
        .await
        .map_err(AppError::from_repo)?;

    Ok(Json(build_view(&state, &shopper.owner_key()).await?))
}

/// DELETE /api/cart - 清空购物车
pub async fn clear(State(state): State<ServerState>, shopper: Shopper) -> AppResult<Json<bool>> {
    CartRepository::new(state.db.clone())
        .clear_owner(&shopper.owner_key())
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(true))
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    /// 登录前的访客会话令牌
    pub guest_session: String,
}

/// POST /api/cart/merge - 登录后合并访客购物车
pub async fn merge(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<MergeRequest>,
) -> AppResult<Json<CartView>> {
    if !matches!(shopper.0, ShopperRef::User(_)) {
        return Err(AppError::validation("cart merge requires an authenticated user"));
    }

    let guest_key = ShopperRef::Guest(payload.guest_session).storage_key();
    CartRepository::new(state.db.clone())
        .merge_into(&guest_key, &shopper.owner_key())
        .await
        .map_err(AppError::from_repo)?;

    Ok(Json(build_view(&state, &shopper.owner_key()).await?))
}
