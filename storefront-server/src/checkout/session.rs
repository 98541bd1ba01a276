//! Checkout Session
//!
//! 服务端结账会话：按购物者持有支付阶段状态机、解析缓存、
//! 已选地址、折扣码与实时监听器。
//!
//! 会话在打开结账视图时创建，关闭视图或下单完成后销毁；
//! 监听器的生命周期严格绑定会话 (创建即订阅，销毁即退订)，
//! 而不是进程级常驻监听加条件早退。

use std::sync::Arc;

use parking_lot::Mutex;

use dashmap::DashMap;

use shared::ShopperRef;
use shared::checkout::{PaymentPhase, ResolvedProduct};
use shared::message::{NotificationPayload, SyncPayload};
use shared::models::{Order, OrderAddress, PaymentState};

use crate::message::MessageBus;
use crate::notify::ConfirmationNotifier;

use super::listeners::{ListenerHandle, spawn_listener};
use super::payment::transition;
use super::resolver::{ResolutionCache, resolve_lines};
use super::totals;
use super::{CheckoutDeps, CheckoutError, Quote};

/// 结账会话
pub struct CheckoutSession {
    shopper: ShopperRef,
    phase: Mutex<PaymentPhase>,
    cache: ResolutionCache,
    address: Mutex<Option<OrderAddress>>,
    discount_code: Mutex<Option<String>>,
    /// 下单后记录，供回调/重定向路径定位订单
    order_id: Mutex<Option<String>>,
    /// 非阻塞提示 (价格变动、商品下架等)，由客户端轮询取走
    notices: Mutex<Vec<NotificationPayload>>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl CheckoutSession {
    fn new(shopper: ShopperRef) -> Arc<Self> {
        Arc::new(Self {
            shopper,
            phase: Mutex::new(PaymentPhase::Idle),
            cache: ResolutionCache::new(),
            address: Mutex::new(None),
            discount_code: Mutex::new(None),
            order_id: Mutex::new(None),
            notices: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
        })
    }

    pub fn shopper(&self) -> &ShopperRef {
        &self.shopper
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn phase(&self) -> PaymentPhase {
        *self.phase.lock()
    }

    /// 推进支付阶段 (非法转移报错)
    pub fn advance_phase(&self, to: PaymentPhase) -> Result<PaymentPhase, CheckoutError> {
        let mut phase = self.phase.lock();
        *phase = transition(*phase, to)?;
        Ok(*phase)
    }

    /// "购物车为空" 是否仍意味着用户放弃了结账
    ///
    /// 导航逻辑查询这里，而不是读全局布尔标记。
    pub fn cart_empty_means_abandoned(&self) -> bool {
        self.phase().cart_empty_means_abandoned()
    }

    pub fn select_address(&self, address: OrderAddress) {
        *self.address.lock() = Some(address);
    }

    pub fn address(&self) -> Option<OrderAddress> {
        self.address.lock().clone()
    }

    pub fn set_discount_code(&self, code: Option<String>) {
        *self.discount_code.lock() = code;
    }

    pub fn discount_code(&self) -> Option<String> {
        self.discount_code.lock().clone()
    }

    pub fn set_order_id(&self, id: String) {
        *self.order_id.lock() = Some(id);
    }

    pub fn order_id(&self) -> Option<String> {
        self.order_id.lock().clone()
    }

    /// 追加非阻塞提示
    pub fn push_notice(&self, notice: NotificationPayload) {
        self.notices.lock().push(notice);
    }

    /// 取走全部积压提示
    pub fn drain_notices(&self) -> Vec<NotificationPayload> {
        std::mem::take(&mut *self.notices.lock())
    }

    /// 某行的缓存解析失效 (变更事件触发)
    pub fn invalidate_line(&self, line_id: &str) -> Option<ResolvedProduct> {
        self.cache.remove(line_id).map(|(_, v)| v)
    }

    fn attach_listener(&self, handle: ListenerHandle) {
        let mut listener = self.listener.lock();
        if let Some(old) = listener.take() {
            old.shutdown();
        }
        *listener = Some(handle);
    }

    /// 退订实时监听 (关闭会话或支付启动时)
    pub fn teardown_listener(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.shutdown();
        }
    }
}

/// 结账会话注册表 - 按购物者存储键索引
#[derive(Clone, Default)]
pub struct CheckoutSessions {
    sessions: Arc<DashMap<String, Arc<CheckoutSession>>>,
}

impl CheckoutSessions {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn get(&self, owner_key: &str) -> Option<Arc<CheckoutSession>> {
        self.sessions.get(owner_key).map(|s| s.clone())
    }

    /// 打开 (或取回) 会话，并确保监听器已挂载
    ///
    /// 浏览器刷新场景：存在带支付句柄的未支付订单时，
    /// 会话直接回到 AwaitingPayment，而不是从 Idle 重来。
    pub async fn open(
        &self,
        shopper: &ShopperRef,
        deps: &CheckoutDeps,
        bus: &MessageBus,
    ) -> Result<Arc<CheckoutSession>, CheckoutError> {
        let owner_key = shopper.storage_key();

        if let Some(existing) = self.get(&owner_key) {
            return Ok(existing);
        }

        let session = CheckoutSession::new(shopper.clone());

        // 刷新恢复：最近一笔带句柄的未支付订单让会话重回等待支付
        let orders = deps.orders.find_by_owner(&owner_key).await?;
        if let Some(pending) = orders
            .iter()
            .find(|o| o.payment_state == PaymentState::Unpaid && o.payment_intent.is_some())
        {
            if let Some(id) = &pending.id {
                session.set_order_id(id.clone());
            }
            session.advance_phase(PaymentPhase::AwaitingPayment)?;
        }

        let handle = spawn_listener(bus.clone(), deps.clone(), session.clone());
        session.attach_listener(handle);

        self.sessions.insert(owner_key, session.clone());
        Ok(session)
    }

    /// 关闭会话：退订监听并移除
    pub fn close(&self, owner_key: &str) {
        if let Some((_, session)) = self.sessions.remove(owner_key) {
            session.teardown_listener();
        }
    }
}

/// 构建当前购物车的结账报价
///
/// 会话缓存的解析结果优先；折扣码失效时静默降级并留提示。
pub async fn build_quote(
    deps: &CheckoutDeps,
    session: &CheckoutSession,
) -> Result<Quote, CheckoutError> {
    let owner_key = session.shopper().storage_key();
    let lines = deps.carts.find_by_owner(&owner_key).await?;
    let resolved = resolve_lines(&deps.catalog, &lines, session.cache()).await;
    let settings = deps.settings.get().await?;

    let priced: Vec<(&ResolvedProduct, i32)> = resolved
        .iter()
        .zip(lines.iter().map(|l| l.quantity))
        .collect();

    let discount = match session.discount_code() {
        Some(code) => match deps.discounts.find_by_code(&code).await? {
            Some(found) => {
                let subtotal = totals::calculate(&priced, &settings, None).subtotal;
                match totals::discount_rejection(
                    &found,
                    subtotal,
                    chrono::Utc::now().timestamp_millis(),
                ) {
                    None => Some(found),
                    Some(reason) => {
                        session.set_discount_code(None);
                        session.push_notice(NotificationPayload {
                            title: "Discount removed".to_string(),
                            message: reason,
                            level: shared::message::NotificationLevel::Warning,
                            category: shared::message::NotificationCategory::Checkout,
                            data: None,
                        });
                        None
                    }
                }
            }
            None => {
                session.set_discount_code(None);
                None
            }
        },
        None => None,
    };

    let order_totals = totals::calculate(&priced, &settings, discount.as_ref());

    Ok(Quote {
        lines,
        resolved,
        totals: order_totals,
    })
}

/// 支付成功收敛点
///
/// 客户端回调与重定向返回两条路径都走到这里，行为完全一致：
/// 1. 阶段转移到 Succeeded (重复到达幂等)
/// 2. 订单标记已支付
/// 3. 清空购物车 (此时 FSM 已在 Succeeded，空车不会被当作放弃结账)
/// 4. best-effort 发送确认通知，绝不阻塞也绝不失败
pub async fn confirm_success(
    deps: &CheckoutDeps,
    notifier: Arc<dyn ConfirmationNotifier>,
    session: &CheckoutSession,
    order_id: &str,
) -> Result<Order, CheckoutError> {
    session.advance_phase(PaymentPhase::Succeeded)?;

    let order = deps
        .orders
        .set_payment_state(order_id, PaymentState::Paid)
        .await?;

    let owner_key = session.shopper().storage_key();
    deps.carts.clear_owner(&owner_key).await?;

    // 支付期间监听已被压制；完成后会话不再需要订阅
    session.teardown_listener();

    if let Some(recipient) = order.guest_email.clone() {
        let order_clone = order.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.order_confirmation(&order_clone, &recipient).await {
                tracing::warn!(error = %e, "Order confirmation notification failed");
            }
        });
    }

    tracing::info!(order_id = %order_id, "Checkout completed");
    Ok(order)
}

/// 支付失败
///
/// 订单与购物车原样保留，用户可重试；处理器的错误消息原样转述。
pub fn confirm_failure(session: &CheckoutSession, message: &str) -> Result<(), CheckoutError> {
    session.advance_phase(PaymentPhase::Failed)?;
    tracing::warn!(error = %message, "Payment failed, order and cart left intact");
    Ok(())
}

/// 判定一条同步事件是否与会话相关
///
/// 变更流无法原生表达 "id 在集合内" 过滤，这里做客户端过滤：
/// 商品事件匹配购物车行引用，地址事件匹配会话所属购物者。
pub fn event_relevance(payload: &SyncPayload, owner_key: &str, product_ids: &[String]) -> EventKind {
    match payload.resource.as_str() {
        "menu_item" | "dish" | "legacy_product" => {
            if product_ids.iter().any(|id| id == &payload.id) {
                EventKind::Catalog
            } else {
                EventKind::Irrelevant
            }
        }
        "address" => {
            let owner_matches = payload
                .data
                .as_ref()
                .and_then(|d| d.get("owner"))
                .and_then(|o| o.as_str())
                .is_some_and(|o| o == owner_key);
            if owner_matches {
                EventKind::Address
            } else {
                EventKind::Irrelevant
            }
        }
        _ => EventKind::Irrelevant,
    }
}

/// 事件分类：决定防抖后重跑哪个组件 (不会无条件两个都跑)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// 重跑 Product Resolver
    Catalog,
    /// 重跑 Address Manager (提示地址簿已变化)
    Address,
    Irrelevant,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sync(resource: &str, id: &str, data: Option<serde_json::Value>) -> SyncPayload {
        SyncPayload {
            resource: resource.to_string(),
            version: 1,
            action: "updated".to_string(),
            id: id.to_string(),
            data,
        }
    }

    #[test]
    fn test_event_relevance_catalog_id_filter() {
        let ids = vec!["menu_item:a".to_string()];
        assert_eq!(
            event_relevance(&make_sync("menu_item", "menu_item:a", None), "user:u", &ids),
            EventKind::Catalog
        );
        assert_eq!(
            event_relevance(&make_sync("menu_item", "menu_item:b", None), "user:u", &ids),
            EventKind::Irrelevant
        );
    }

    #[test]
    fn test_event_relevance_address_owner_filter() {
        let data = serde_json::json!({ "owner": "user:u" });
        assert_eq!(
            event_relevance(&make_sync("address", "address:x", Some(data)), "user:u", &[]),
            EventKind::Address
        );
        let other = serde_json::json!({ "owner": "user:other" });
        assert_eq!(
            event_relevance(&make_sync("address", "address:x", Some(other)), "user:u", &[]),
            EventKind::Irrelevant
        );
    }

    #[test]
    fn test_event_relevance_ignores_unrelated_tables() {
        assert_eq!(
            event_relevance(&make_sync("reservation", "reservation:x", None), "user:u", &[]),
            EventKind::Irrelevant
        );
    }

    #[test]
    fn test_session_phase_gating() {
        let session = CheckoutSession::new(ShopperRef::Guest("g".into()));
        assert!(session.cart_empty_means_abandoned());

        session.advance_phase(PaymentPhase::AwaitingPayment).unwrap();
        session.advance_phase(PaymentPhase::Succeeded).unwrap();
        // 成功态下空车不再意味着放弃结账
        assert!(!session.cart_empty_means_abandoned());
    }

    #[test]
    fn test_session_rejects_illegal_phase_jump() {
        let session = CheckoutSession::new(ShopperRef::Guest("g".into()));
        assert!(session.advance_phase(PaymentPhase::Succeeded).is_err());
        // 失败的转移不改变当前阶段
        assert_eq!(session.phase(), PaymentPhase::Idle);
    }
}
