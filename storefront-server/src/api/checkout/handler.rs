//! Checkout Handlers

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use shared::checkout::PaymentPhase;
use shared::message::NotificationPayload;
use shared::models::{Order, PaymentState};

use crate::api::Shopper;
use crate::checkout::address::{AddressForm, AddressMode, validate as validate_address};
use crate::checkout::payment::parse_redirect_return;
use crate::checkout::placement::{PlacementRequest, place_order, retry_payment};
use crate::checkout::{Quote, session, totals};
use crate::core::ServerState;
use crate::db::repository::{
    AddressRepository, CartRepository, OrderRepository, WebhookEventRepository,
};
use crate::payments::{PaymentHandle, stripe};
use crate::utils::{AppError, AppResult};

const RESOURCE_ORDER: &str = "order";

// =============================================================================
// Session lifecycle
// =============================================================================

/// 会话状态视图
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub phase: PaymentPhase,
    pub order_id: Option<String>,
    /// "空车" 此刻是否还意味着用户放弃了结账 (导航提示用)
    pub cart_empty_means_abandoned: bool,
    pub notices: Vec<NotificationPayload>,
}

/// POST /api/checkout/session - 打开结账会话
///
/// 挂载实时监听；存在未支付订单时恢复到等待支付阶段。
pub async fn open_session(
    State(state): State<ServerState>,
    shopper: Shopper,
) -> AppResult<Json<SessionStatus>> {
    // 上一单已成功的会话是终态；重新进入结账从头开始
    if let Some(existing) = state.checkout_sessions.get(&shopper.owner_key())
        && existing.phase() == PaymentPhase::Succeeded
    {
        state.checkout_sessions.close(&shopper.owner_key());
    }

    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    Ok(Json(SessionStatus {
        phase: session.phase(),
        order_id: session.order_id(),
        cart_empty_means_abandoned: session.cart_empty_means_abandoned(),
        notices: session.drain_notices(),
    }))
}

/// GET /api/checkout/session - 会话状态 (轮询提示用)
pub async fn session_status(
    State(state): State<ServerState>,
    shopper: Shopper,
) -> AppResult<Json<SessionStatus>> {
    let session = state
        .checkout_sessions
        .get(&shopper.owner_key())
        .ok_or_else(|| AppError::not_found("No open checkout session"))?;

    Ok(Json(SessionStatus {
        phase: session.phase(),
        order_id: session.order_id(),
        cart_empty_means_abandoned: session.cart_empty_means_abandoned(),
        notices: session.drain_notices(),
    }))
}

/// DELETE /api/checkout/session - 关闭会话 (退订监听)
pub async fn close_session(
    State(state): State<ServerState>,
    shopper: Shopper,
) -> AppResult<Json<bool>> {
    state.checkout_sessions.close(&shopper.owner_key());
    Ok(Json(true))
}

// =============================================================================
// Quote & inputs
// =============================================================================

/// GET /api/checkout/quote - 当前报价 (解析 + 总价)
pub async fn quote(State(state): State<ServerState>, shopper: Shopper) -> AppResult<Json<Quote>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;
    let quote = session::build_quote(&deps, &session).await?;
    Ok(Json(quote))
}

/// 地址选择请求：二选一
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectAddressRequest {
    /// 地址簿选取：预填为统一表单后校验 (允许缺 phone)
    Saved { address_id: String },
    /// 手工录入 (phone 必填)
    Manual { form: AddressForm },
}

/// POST /api/checkout/address - 选择结账地址
pub async fn select_address(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<SelectAddressRequest>,
) -> AppResult<Json<bool>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    let validated = match payload {
        SelectAddressRequest::Saved { address_id } => {
            let saved = AddressRepository::new(state.db.clone())
                .find_by_id(&shopper.owner_key(), &address_id)
                .await
                .map_err(|e| AppError::database(e.to_string()))?
                .ok_or_else(|| AppError::not_found(format!("Address {}", address_id)))?;
            validate_address(&AddressForm::from_saved(&saved), AddressMode::Saved)?
        }
        SelectAddressRequest::Manual { form } => validate_address(&form, AddressMode::Manual)?,
    };

    session.select_address(validated);
    Ok(Json(true))
}

#[derive(Debug, Deserialize)]
pub struct ApplyDiscountRequest {
    pub code: String,
}

/// POST /api/checkout/discount - 应用折扣码
pub async fn apply_discount(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<ApplyDiscountRequest>,
) -> AppResult<Json<Quote>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    // 先以当前小计校验，再挂到会话上
    let current = session::build_quote(&deps, &session).await?;
    let code = deps
        .discounts
        .find_by_code(&payload.code)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Discount code {}", payload.code)))?;
    if let Some(reason) = totals::discount_rejection(
        &code,
        current.totals.subtotal,
        chrono::Utc::now().timestamp_millis(),
    ) {
        return Err(AppError::business_rule(reason));
    }

    session.set_discount_code(Some(code.code.clone()));
    let quote = session::build_quote(&deps, &session).await?;
    Ok(Json(quote))
}

/// DELETE /api/checkout/discount - 移除折扣码
///
/// 移除后的报价与从未应用时一致。
pub async fn remove_discount(
    State(state): State<ServerState>,
    shopper: Shopper,
) -> AppResult<Json<Quote>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    session.set_discount_code(None);
    let quote = session::build_quote(&deps, &session).await?;
    Ok(Json(quote))
}

// =============================================================================
// Placement & payment
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    /// 联系邮箱；访客必填
    pub contact_email: Option<String>,
}

/// 下单响应：订单 + 支付句柄
#[derive(Debug, Serialize)]
pub struct PlaceResponse {
    pub order: Order,
    pub payment: PaymentHandle,
}

/// POST /api/checkout/place - 下单
///
/// 原子创建成功后签发支付句柄，会话进入等待支付；
/// 句柄失败时订单保留为未支付，错误体携带 order_id 供重试。
pub async fn place(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<PlaceRequest>,
) -> AppResult<Json<PlaceResponse>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    // 已有订单在等支付时不得重复下单；应走 payment/retry
    if session.phase() == PaymentPhase::AwaitingPayment {
        return Err(AppError::conflict(
            "An order is already awaiting payment; retry the payment instead",
        ));
    }

    let address = session
        .address()
        .ok_or_else(|| AppError::validation("No checkout address selected"))?;

    let request = PlacementRequest {
        address,
        contact_email: payload.contact_email,
        discount_code: session.discount_code(),
    };

    let outcome = place_order(
        &deps,
        state.payments.as_ref(),
        &shopper.0,
        session.cache(),
        request,
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            // 句柄失败时订单已存在：记到会话上，支付可重试
            if let crate::checkout::CheckoutError::PaymentHandleFailed { order_id, .. } = &e {
                session.set_order_id(order_id.clone());
            }
            return Err(e.into());
        }
    };

    let order_id = outcome.order.id.clone().unwrap_or_default();
    session.set_order_id(order_id.clone());
    // 支付表单即将展示；监听器从此被压制
    session.advance_phase(PaymentPhase::AwaitingPayment)?;

    state
        .broadcast_sync(RESOURCE_ORDER, "created", &order_id, Some(&outcome.order))
        .await;

    Ok(Json(PlaceResponse {
        order: outcome.order,
        payment: outcome.payment,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentConfirmRequest {
    pub success: bool,
    /// 处理器返回的错误消息 (失败时)
    pub message: Option<String>,
}

/// POST /api/checkout/payment/confirm - 处理器客户端回调
pub async fn payment_confirm(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<PaymentConfirmRequest>,
) -> AppResult<Json<SessionStatus>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;
    let order_id = session
        .order_id()
        .ok_or_else(|| AppError::validation("No order pending payment in this session"))?;

    if payload.success {
        let order =
            session::confirm_success(&deps, state.notifier.clone(), &session, &order_id).await?;
        state
            .broadcast_sync(RESOURCE_ORDER, "updated", &order_id, Some(&order))
            .await;
    } else {
        session::confirm_failure(&session, payload.message.as_deref().unwrap_or("payment failed"))?;
    }

    Ok(Json(SessionStatus {
        phase: session.phase(),
        order_id: Some(order_id),
        cart_empty_means_abandoned: session.cart_empty_means_abandoned(),
        notices: session.drain_notices(),
    }))
}

/// GET /api/checkout/payment/return - 浏览器重定向返回
///
/// 与客户端回调收敛到完全相同的行为。
pub async fn payment_return(
    State(state): State<ServerState>,
    shopper: Shopper,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<SessionStatus>> {
    let outcome = parse_redirect_return(&query)
        .ok_or_else(|| AppError::invalid("Missing payment markers in return URL"))?;

    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    // 以 intent 定位订单 (刷新后会话可能丢失 order_id)
    let order = deps
        .orders
        .find_by_payment_intent(&outcome.payment_intent)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Order for returned payment"))?;
    let order_id = order.id.clone().unwrap_or_default();
    session.set_order_id(order_id.clone());

    if outcome.succeeded {
        let order =
            session::confirm_success(&deps, state.notifier.clone(), &session, &order_id).await?;
        state
            .broadcast_sync(RESOURCE_ORDER, "updated", &order_id, Some(&order))
            .await;
    } else {
        session::confirm_failure(&session, "payment was not completed")?;
    }

    Ok(Json(SessionStatus {
        phase: session.phase(),
        order_id: Some(order_id),
        cart_empty_means_abandoned: session.cart_empty_means_abandoned(),
        notices: session.drain_notices(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRetryRequest {
    pub order_id: String,
}

/// POST /api/checkout/payment/retry - 重试支付
///
/// 订单已存在且未支付；签发新句柄，不重建订单。
pub async fn payment_retry(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<PaymentRetryRequest>,
) -> AppResult<Json<PlaceResponse>> {
    let deps = state.checkout_deps();
    let session = state
        .checkout_sessions
        .open(&shopper.0, &deps, &state.message_bus)
        .await?;

    let outcome = retry_payment(&deps, state.payments.as_ref(), &payload.order_id).await?;

    session.set_order_id(payload.order_id.clone());
    // 首次失败在句柄阶段时会话还在 Idle；失败后重试则从 Failed 回到等待
    if session.phase() != PaymentPhase::AwaitingPayment {
        session.advance_phase(PaymentPhase::AwaitingPayment)?;
    }

    Ok(Json(PlaceResponse {
        order: outcome.order,
        payment: outcome.payment,
    }))
}

// =============================================================================
// Processor webhook
// =============================================================================

/// POST /api/checkout/webhook - 支付处理器回调
///
/// 必须读原始 body 做 HMAC 签名校验；事件 id 先落库实现幂等。
pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. 签名头
    let sig_header = match headers.get("stripe-signature").and_then(|v| v.to_str().ok()) {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. 验签
    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.config.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. 解析事件
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    let event_id = match event["id"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("Webhook event missing id");
            return StatusCode::BAD_REQUEST;
        }
    };
    tracing::info!(event_type = event_type, "Received payment webhook");

    // 4. 幂等：先插入，唯一索引冲突即为重复事件
    match WebhookEventRepository::new(state.db.clone())
        .record(event_id, event_type)
        .await
    {
        Ok(false) => {
            tracing::info!(event_id = event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {}
    }

    // 5. 按事件类型处理
    let intent_id = event["data"]["object"]["id"].as_str().unwrap_or("");
    match event_type {
        "payment_intent.succeeded" => {
            if let Err(e) = settle_paid_order(&state, intent_id).await {
                tracing::error!(error = %e, intent = intent_id, "Failed to settle paid order");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        "payment_intent.payment_failed" => {
            if let Ok(Some(order)) = OrderRepository::new(state.db.clone())
                .find_by_payment_intent(intent_id)
                .await
                && let Some(order_id) = order.id.clone()
                && order.payment_state == PaymentState::Unpaid
            {
                let _ = OrderRepository::new(state.db.clone())
                    .set_payment_state(&order_id, PaymentState::Failed)
                    .await;
            }
        }
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
        }
    }

    StatusCode::OK
}

/// webhook 的支付落账路径：标记已支付、清空购物车、best-effort 通知
///
/// 没有交互式会话可推进；会话 (若还在) 下次被读取时
/// 会据订单状态同步阶段。
async fn settle_paid_order(state: &ServerState, intent_id: &str) -> AppResult<()> {
    let orders = OrderRepository::new(state.db.clone());
    let order = orders
        .find_by_payment_intent(intent_id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Order for intent {intent_id}")))?;

    let order_id = order.id.clone().unwrap_or_default();
    if order.payment_state == PaymentState::Paid {
        return Ok(()); // 回调与客户端路径已处理过
    }

    let order = orders
        .set_payment_state(&order_id, PaymentState::Paid)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    if let Some(owner) = &order.owner {
        CartRepository::new(state.db.clone())
            .clear_owner(owner)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
    }

    state
        .broadcast_sync(RESOURCE_ORDER, "updated", &order_id, Some(&order))
        .await;

    if let Some(recipient) = order.guest_email.clone() {
        let notifier = state.notifier.clone();
        let order_clone = order.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.order_confirmation(&order_clone, &recipient).await {
                tracing::warn!(error = %e, "Order confirmation notification failed");
            }
        });
    }

    Ok(())
}
