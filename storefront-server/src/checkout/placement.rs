//! Order Placement
//!
//! 两段式：
//! 1. 一次原子创建调用 (头 + 行，存储层价格/库存复验，全有或全无)
//! 2. 向支付处理器请求授权句柄
//!
//! 两段刻意解耦：第 2 段失败时订单已以未支付状态存在，
//! 用户可以只重试支付，不必重新下单。

use shared::ShopperRef;
use shared::checkout::ResolvedProduct;
use shared::models::{Order, OrderAddress, OrderLine, PaymentState, VariantSelection};

use crate::payments::{PaymentGateway, PaymentHandle};
use crate::utils::validation::validate_email;

use super::resolver::{ResolutionCache, resolve_lines};
use super::totals::{self, line_total};
use super::{CheckoutDeps, CheckoutError};

/// 下单请求 (地址已通过 address::validate)
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub address: OrderAddress,
    /// 联系邮箱；访客必填 (收据与确认通知)
    pub contact_email: Option<String>,
    pub discount_code: Option<String>,
}

/// 下单结果
#[derive(Debug)]
pub struct PlacementOutcome {
    pub order: Order,
    pub payment: PaymentHandle,
}

/// 下单
///
/// 失败模式：
/// - 存储层拒绝 (价格/库存) -> [`CheckoutError::PlacementRejected`]，无订单产生
/// - 句柄请求失败 -> [`CheckoutError::PaymentHandleFailed`]，订单已存在且可重试
pub async fn place_order(
    deps: &CheckoutDeps,
    gateway: &dyn PaymentGateway,
    shopper: &ShopperRef,
    cache: &ResolutionCache,
    request: PlacementRequest,
) -> Result<PlacementOutcome, CheckoutError> {
    let owner_key = shopper.storage_key();

    // 访客必须留邮箱
    if shopper.is_guest() {
        let email = request
            .contact_email
            .as_deref()
            .ok_or_else(|| CheckoutError::Validation("contact email is required for guest checkout".into()))?;
        validate_email(email, "contact_email")
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;
    }

    let lines = deps.carts.find_by_owner(&owner_key).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let resolved = resolve_lines(&deps.catalog, &lines, cache).await;
    let settings = deps.settings.get().await?;

    // 折扣码：读取 + 可用性校验
    let priced: Vec<(&ResolvedProduct, i32)> = resolved
        .iter()
        .zip(lines.iter().map(|l| l.quantity))
        .collect();
    let discount = match &request.discount_code {
        Some(code) => {
            let found = deps
                .discounts
                .find_by_code(code)
                .await?
                .ok_or_else(|| CheckoutError::DiscountRejected(format!("Unknown discount code {code}")))?;
            let subtotal = totals::calculate(&priced, &settings, None).subtotal;
            if let Some(reason) =
                totals::discount_rejection(&found, subtotal, chrono::Utc::now().timestamp_millis())
            {
                return Err(CheckoutError::DiscountRejected(reason));
            }
            Some(found)
        }
        None => None,
    };

    let order_totals = totals::calculate(&priced, &settings, discount.as_ref());

    // 订单行：成交价快照
    let order_lines: Vec<OrderLine> = lines
        .iter()
        .zip(resolved.iter())
        .map(|(line, product)| OrderLine {
            product_ref: line.product_ref.clone(),
            name: product.name.clone(),
            variant_name: product.variant_name.clone(),
            unit_price: product.current_price,
            quantity: line.quantity,
            line_total: line_total(product.current_price, line.quantity),
        })
        .collect();
    let selections: Vec<Option<VariantSelection>> =
        lines.iter().map(|l| l.selection.clone()).collect();

    // owner 恒为存储键 (访客也是，购物车清空要用)；guest_email 仅访客订单携带
    let owner = Some(owner_key.clone());
    let guest_email = if shopper.is_guest() {
        request.contact_email.clone()
    } else {
        None
    };

    let order = deps
        .orders
        .create_with_lines(
            owner,
            guest_email,
            order_lines,
            &selections,
            request.address,
            order_totals,
            discount.as_ref().map(|d| d.code.clone()),
        )
        .await
        .map_err(|e| match e {
            crate::db::repository::RepoError::Rejected(msg) => CheckoutError::PlacementRejected(msg),
            other => CheckoutError::Repo(other),
        })?;

    let order_id = order.id.clone().unwrap_or_default();

    // 折扣用量：恰好一次；重复记录说明是重放，仅记日志
    if let Some(code) = &discount {
        let recorded = deps.discounts.record_usage(&code.code, &order_id).await?;
        if !recorded {
            tracing::warn!(code = %code.code, order_id = %order_id, "Discount usage already recorded");
        }
    }

    // 第 2 段：支付授权句柄
    issue_handle(deps, gateway, order, &settings.currency).await
}

/// 为已存在的未支付订单重试支付
///
/// 不会重新创建订单；签发新句柄并覆盖旧引用。
pub async fn retry_payment(
    deps: &CheckoutDeps,
    gateway: &dyn PaymentGateway,
    order_id: &str,
) -> Result<PlacementOutcome, CheckoutError> {
    let order = deps
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| CheckoutError::NotFound(format!("Order {order_id}")))?;

    if order.payment_state == PaymentState::Paid {
        return Err(CheckoutError::Phase(format!("Order {order_id} is already paid")));
    }

    let settings = deps.settings.get().await?;
    issue_handle(deps, gateway, order, &settings.currency).await
}

async fn issue_handle(
    deps: &CheckoutDeps,
    gateway: &dyn PaymentGateway,
    order: Order,
    currency: &str,
) -> Result<PlacementOutcome, CheckoutError> {
    let order_id = order.id.clone().unwrap_or_default();
    let email = order.guest_email.as_deref();

    let handle = gateway
        .create_intent(order.totals.grand_total, currency, &order_id, email)
        .await
        .map_err(|e| CheckoutError::PaymentHandleFailed {
            order_id: order_id.clone(),
            message: e.to_string(),
        })?;

    deps.orders
        .set_payment_intent(&order_id, &handle.intent_id)
        .await?;

    let mut order = order;
    order.payment_intent = Some(handle.intent_id.clone());

    tracing::info!(
        order_id = %order_id,
        intent = %handle.intent_id,
        amount = order.totals.grand_total,
        "Payment handle issued"
    );

    Ok(PlacementOutcome { order, payment: handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::payments::PaymentError;
    use async_trait::async_trait;
    use shared::ProductRef;
    use shared::models::{MenuItemCreate, MenuItemUpdate};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 桩网关：可配置失败，并计数调用次数
    struct StubGateway {
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubGateway {
        fn ok() -> Self {
            Self { fail: false, calls: AtomicUsize::new(0) }
        }
        fn failing() -> Self {
            Self { fail: true, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_intent(
            &self,
            amount: f64,
            currency: &str,
            order_id: &str,
            _email: Option<&str>,
        ) -> Result<PaymentHandle, PaymentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PaymentError::Request("connection refused".into()));
            }
            Ok(PaymentHandle {
                intent_id: format!("pi_stub_{order_id}_{n}"),
                client_secret: "cs_stub".to_string(),
                amount_minor: crate::payments::to_minor_units(amount),
                currency: currency.to_string(),
            })
        }
    }

    fn make_address() -> OrderAddress {
        OrderAddress {
            full_name: "Ana García".into(),
            line1: "Calle Mayor 1".into(),
            line2: None,
            city: "Madrid".into(),
            region: "Madrid".into(),
            postal_code: "28013".into(),
            country: "ES".into(),
            phone: Some("+34 600 000 000".into()),
        }
    }

    async fn setup_cart(deps: &CheckoutDeps, db: &DbService, price: f64, qty: i32) -> String {
        let repo = crate::db::repository::MenuItemRepository::new(db.db.clone());
        let item = repo
            .create(MenuItemCreate {
                name: "Margherita Pizza".into(),
                description: None,
                image: None,
                category: "category:main".into(),
                price,
                sort_order: None,
                variants: None,
                combinations: None,
            })
            .await
            .unwrap();
        let item_id = item.id.unwrap();
        deps.carts
            .add_line(
                "guest:g1",
                ProductRef::MenuItem(item_id.clone()),
                qty,
                None,
                Some(price),
                None,
            )
            .await
            .unwrap();
        item_id
    }

    fn make_request() -> PlacementRequest {
        PlacementRequest {
            address: make_address(),
            contact_email: Some("ana@example.com".into()),
            discount_code: None,
        }
    }

    #[tokio::test]
    async fn test_successful_placement_issues_handle() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        setup_cart(&deps, &db, 450.0, 2).await;

        let gateway = StubGateway::ok();
        let shopper = ShopperRef::Guest("g1".into());
        let cache = ResolutionCache::new();

        let outcome = place_order(&deps, &gateway, &shopper, &cache, make_request())
            .await
            .unwrap();

        assert_eq!(outcome.order.totals.grand_total, 972.0);
        assert_eq!(outcome.order.payment_state, PaymentState::Unpaid);
        assert!(outcome.order.payment_intent.is_some());
        assert_eq!(outcome.payment.amount_minor, 97200);

        // 下单不清空购物车；清空发生在支付成功时
        let cart = deps.carts.find_by_owner("guest:g1").await.unwrap();
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_blocks_placement() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        let gateway = StubGateway::ok();
        let shopper = ShopperRef::Guest("g1".into());
        let cache = ResolutionCache::new();

        let result = place_order(&deps, &gateway, &shopper, &cache, make_request()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_guest_without_email_blocked() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        setup_cart(&deps, &db, 450.0, 1).await;

        let gateway = StubGateway::ok();
        let shopper = ShopperRef::Guest("g1".into());
        let cache = ResolutionCache::new();

        let mut request = make_request();
        request.contact_email = None;
        let result = place_order(&deps, &gateway, &shopper, &cache, request).await;
        assert!(matches!(result, Err(CheckoutError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unavailable_line_rejected_atomically() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        let item_id = setup_cart(&deps, &db, 450.0, 2).await;

        // 解析后、下单前商品下架 (模拟竞争)
        // 先解析填充缓存，使 placement 使用过期视图
        let cache = ResolutionCache::new();
        let lines = deps.carts.find_by_owner("guest:g1").await.unwrap();
        let _ = resolve_lines(&deps.catalog, &lines, &cache).await;

        let repo = crate::db::repository::MenuItemRepository::new(db.db.clone());
        repo.update(
            &item_id,
            MenuItemUpdate {
                name: None,
                description: None,
                image: None,
                category: None,
                price: None,
                is_available: Some(false),
                sort_order: None,
                is_active: None,
                variants: None,
                combinations: None,
            },
        )
        .await
        .unwrap();

        let gateway = StubGateway::ok();
        let shopper = ShopperRef::Guest("g1".into());
        let result = place_order(&deps, &gateway, &shopper, &cache, make_request()).await;

        match result {
            Err(CheckoutError::PlacementRejected(msg)) => {
                // 错误点名失败行
                assert!(msg.contains("Margherita Pizza"), "message was: {msg}");
            }
            other => panic!("Expected PlacementRejected, got {other:?}"),
        }

        // 无订单产生，购物车原样
        let orders = deps.orders.find_by_owner("guest:g1").await.unwrap();
        assert!(orders.is_empty());
        let cart = deps.carts.find_by_owner("guest:g1").await.unwrap();
        assert_eq!(cart.len(), 1);
        // 支付处理器从未被调用
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handle_failure_leaves_retryable_order() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        setup_cart(&deps, &db, 450.0, 2).await;

        let failing = StubGateway::failing();
        let shopper = ShopperRef::Guest("g1".into());
        let cache = ResolutionCache::new();

        let result = place_order(&deps, &failing, &shopper, &cache, make_request()).await;
        let order_id = match result {
            Err(CheckoutError::PaymentHandleFailed { order_id, .. }) => order_id,
            other => panic!("Expected PaymentHandleFailed, got {other:?}"),
        };

        // 订单已存在，未支付
        let order = deps.orders.find_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_state, PaymentState::Unpaid);

        // 用同一订单重试支付：成功且不产生重复订单
        let gateway = StubGateway::ok();
        let outcome = retry_payment(&deps, &gateway, &order_id).await.unwrap();
        assert_eq!(outcome.order.id.as_deref(), Some(order_id.as_str()));
        assert!(outcome.order.payment_intent.is_some());

        let all_orders = deps.orders.find_by_owner("guest:g1").await.unwrap();
        assert_eq!(all_orders.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_rejected_for_paid_order() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        setup_cart(&deps, &db, 450.0, 1).await;

        let gateway = StubGateway::ok();
        let shopper = ShopperRef::Guest("g1".into());
        let cache = ResolutionCache::new();
        let outcome = place_order(&deps, &gateway, &shopper, &cache, make_request())
            .await
            .unwrap();
        let order_id = outcome.order.id.unwrap();

        deps.orders
            .set_payment_state(&order_id, PaymentState::Paid)
            .await
            .unwrap();

        let result = retry_payment(&deps, &gateway, &order_id).await;
        assert!(matches!(result, Err(CheckoutError::Phase(_))));
    }

    #[tokio::test]
    async fn test_discount_applied_and_usage_recorded_once() {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());
        setup_cart(&deps, &db, 450.0, 2).await;

        deps.discounts
            .create(shared::models::DiscountCodeCreate {
                code: "WELCOME100".into(),
                kind: shared::models::DiscountKind::Fixed,
                value: 100.0,
                min_subtotal: None,
                expires_at: None,
            })
            .await
            .unwrap();

        let gateway = StubGateway::ok();
        let shopper = ShopperRef::Guest("g1".into());
        let cache = ResolutionCache::new();

        let mut request = make_request();
        request.discount_code = Some("welcome100".into());
        let outcome = place_order(&deps, &gateway, &shopper, &cache, request)
            .await
            .unwrap();

        assert_eq!(outcome.order.totals.discount, 100.0);
        assert_eq!(outcome.order.totals.grand_total, 872.0);
        assert_eq!(outcome.order.discount_code.as_deref(), Some("WELCOME100"));

        // 重复记录被唯一索引拒绝 (幂等)
        let order_id = outcome.order.id.unwrap();
        let recorded_again = deps
            .discounts
            .record_usage("WELCOME100", &order_id)
            .await
            .unwrap();
        assert!(!recorded_again);
    }
}
