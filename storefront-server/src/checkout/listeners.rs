//! Realtime Refresh Listeners
//!
//! 每个结账会话一个监听任务：订阅消息总线，过滤出与
//! 当前购物车/购物者相关的变更事件，防抖后重跑对应组件：
//!
//! - 商品表事件 -> 失效缓存并重跑 Product Resolver，比对新旧
//!   解析结果，产生 "价格已变动" / "商品已下架" 的非阻塞提示
//! - 地址表事件 -> 提示地址簿已变化 (已选地址快照不动)
//!
//! 支付阶段为 AwaitingPayment / Succeeded 时事件一律忽略，
//! 避免与结账完成竞争。订阅滞后 (Lagged) 时重新订阅并强制刷新。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use shared::message::{
    BusMessage, EventType, NotificationCategory, NotificationLevel, NotificationPayload,
    SyncPayload,
};

use crate::message::MessageBus;

use super::resolver::resolve_lines;
use super::session::{CheckoutSession, EventKind, event_relevance};
use super::CheckoutDeps;

/// 防抖窗口：首个相关事件后再收集这么久，合并成一次刷新
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// 监听器句柄 - 会话销毁时取消任务
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// 退订：取消任务 (幂等)
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// 挂载一个会话监听任务
pub fn spawn_listener(
    bus: MessageBus,
    deps: CheckoutDeps,
    session: Arc<CheckoutSession>,
) -> ListenerHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        let mut rx = bus.subscribe();
        // 收集窗口内的脏标记
        let mut catalog_dirty: Vec<String> = Vec::new();
        let mut address_dirty = false;

        loop {
            // 有脏标记时等防抖窗口，否则无限等下一条消息
            let msg = if catalog_dirty.is_empty() && !address_dirty {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    msg = rx.recv() => Some(msg),
                }
            } else {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    msg = rx.recv() => Some(msg),
                    _ = tokio::time::sleep(DEBOUNCE_WINDOW) => None,
                }
            };

            match msg {
                None => {
                    // 防抖窗口到期：执行合并刷新
                    refresh(
                        &bus,
                        &deps,
                        &session,
                        std::mem::take(&mut catalog_dirty),
                        std::mem::take(&mut address_dirty),
                    )
                    .await;
                }
                Some(Ok(message)) => {
                    if let Some(kind) = classify(&deps, &session, &message).await {
                        match kind {
                            EventKind::Catalog => {
                                if let Ok(payload) = message.decode::<SyncPayload>() {
                                    catalog_dirty.push(payload.id);
                                }
                            }
                            EventKind::Address => address_dirty = true,
                            EventKind::Irrelevant => {}
                        }
                    }
                }
                Some(Err(RecvError::Lagged(skipped))) => {
                    // 滞后：丢过事件，保守起见整车重解析
                    tracing::warn!(skipped, "Checkout listener lagged, resubscribing");
                    rx = bus.subscribe();
                    catalog_dirty.push(String::new());
                }
                Some(Err(RecvError::Closed)) => break,
            }
        }

        tracing::debug!("Checkout listener stopped");
    });

    ListenerHandle { cancel, task }
}

/// 过滤：只要 Sync 事件，支付期间一律压制，再做相关性判断
async fn classify(
    deps: &CheckoutDeps,
    session: &CheckoutSession,
    message: &BusMessage,
) -> Option<EventKind> {
    if message.event_type != EventType::Sync {
        return None;
    }
    // 等待支付/支付成功期间压制一切刷新
    if session.phase().suppresses_refresh() {
        return None;
    }

    let payload: SyncPayload = message.decode().ok()?;
    let owner_key = session.shopper().storage_key();

    // 变更流表达不了 "id 在购物车内"，在这里补客户端过滤
    let lines = deps.carts.find_by_owner(&owner_key).await.ok()?;
    let product_ids: Vec<String> = lines
        .iter()
        .map(|l| l.product_ref.id().to_string())
        .collect();

    Some(event_relevance(&payload, &owner_key, &product_ids))
}

/// 合并刷新：失效受影响行的缓存，重跑解析，比对并产生提示
async fn refresh(
    bus: &MessageBus,
    deps: &CheckoutDeps,
    session: &CheckoutSession,
    catalog_dirty: Vec<String>,
    address_dirty: bool,
) {
    // 刷新执行前再查一次阶段；事件可能在窗口内被支付启动追上
    if session.phase().suppresses_refresh() {
        return;
    }

    if !catalog_dirty.is_empty() {
        let owner_key = session.shopper().storage_key();
        let Ok(lines) = deps.carts.find_by_owner(&owner_key).await else {
            return;
        };

        // 失效受影响行，记下旧视图用于比对
        let mut previous = Vec::new();
        for line in &lines {
            let affected = catalog_dirty.iter().any(|dirty| {
                dirty.is_empty() || dirty == line.product_ref.id()
            });
            if affected && let Some(id) = &line.id {
                previous.push((id.clone(), session.invalidate_line(id)));
            }
        }

        let resolved = resolve_lines(&deps.catalog, &lines, session.cache()).await;

        // 比对新旧，产生非阻塞提示
        for (line, current) in lines.iter().zip(resolved.iter()) {
            let Some(id) = &line.id else { continue };
            let Some((_, Some(old))) = previous.iter().find(|(pid, _)| pid == id) else {
                continue;
            };

            if old.available && !current.available {
                notify(bus, session, NotificationPayload {
                    title: "Item unavailable".to_string(),
                    message: format!("{} is no longer available", current.name),
                    level: NotificationLevel::Warning,
                    category: NotificationCategory::Checkout,
                    data: None,
                });
            } else if (old.current_price - current.current_price).abs() > f64::EPSILON {
                notify(bus, session, NotificationPayload {
                    title: "Price changed".to_string(),
                    message: format!(
                        "{} is now {:.2} (was {:.2})",
                        current.name, current.current_price, old.current_price
                    ),
                    level: NotificationLevel::Info,
                    category: NotificationCategory::Checkout,
                    data: None,
                });
            }
        }
    }

    if address_dirty {
        notify(bus, session, NotificationPayload {
            title: "Address book updated".to_string(),
            message: "Your saved addresses have changed".to_string(),
            level: NotificationLevel::Info,
            category: NotificationCategory::Checkout,
            data: None,
        });
    }
}

/// 提示双通道：会话内积压 (客户端轮询) + 总线广播
fn notify(bus: &MessageBus, session: &CheckoutSession, payload: NotificationPayload) {
    session.push_notice(payload.clone());
    let _ = bus.publish(BusMessage::notification(&payload));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::MenuItemRepository;
    use shared::checkout::PaymentPhase;
    use shared::models::{MenuItemCreate, MenuItemUpdate};
    use shared::{ProductRef, ShopperRef};

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached in time");
    }

    async fn setup() -> (DbService, CheckoutDeps, MessageBus, String) {
        let db = DbService::new_in_memory().await.unwrap();
        let deps = CheckoutDeps::new(db.db.clone());

        let repo = MenuItemRepository::new(db.db.clone());
        let item = repo
            .create(MenuItemCreate {
                name: "Margherita Pizza".into(),
                description: None,
                image: None,
                category: "category:main".into(),
                price: 450.0,
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
                2,
                None,
                Some(450.0),
                None,
            )
            .await
            .unwrap();

        (db, deps, MessageBus::new(), item_id)
    }

    fn price_update(price: f64) -> MenuItemUpdate {
        MenuItemUpdate {
            name: None,
            description: None,
            image: None,
            category: None,
            price: Some(price),
            is_available: None,
            sort_order: None,
            is_active: None,
            variants: None,
            combinations: None,
        }
    }

    #[tokio::test]
    async fn test_price_change_event_triggers_notice() {
        let (db, deps, bus, item_id) = setup().await;
        let sessions = super::super::CheckoutSessions::new();
        let shopper = ShopperRef::Guest("g1".into());
        let session = sessions.open(&shopper, &deps, &bus).await.unwrap();

        // 先报价一次，填充解析缓存 (旧价)
        let quote = super::super::session::build_quote(&deps, &session).await.unwrap();
        assert_eq!(quote.totals.subtotal, 900.0);

        // 改价并广播变更事件
        let repo = MenuItemRepository::new(db.db.clone());
        repo.update(&item_id, price_update(500.0)).await.unwrap();
        let payload = shared::message::SyncPayload {
            resource: "menu_item".into(),
            version: 1,
            action: "updated".into(),
            id: item_id.clone(),
            data: None,
        };
        bus.publish(BusMessage::sync(&payload)).unwrap();

        // 防抖后：缓存失效、提示产生、重新报价反映新价
        let session_probe = session.clone();
        wait_for(move || !session_probe.drain_notices().is_empty() || session_probe.cache().is_empty()).await;

        let quote = super::super::session::build_quote(&deps, &session).await.unwrap();
        assert_eq!(quote.totals.subtotal, 1000.0);
    }

    #[tokio::test]
    async fn test_events_suppressed_during_payment() {
        let (db, deps, bus, item_id) = setup().await;
        let sessions = super::super::CheckoutSessions::new();
        let shopper = ShopperRef::Guest("g1".into());
        let session = sessions.open(&shopper, &deps, &bus).await.unwrap();

        let _ = super::super::session::build_quote(&deps, &session).await.unwrap();

        // 进入等待支付
        session.advance_phase(PaymentPhase::AwaitingPayment).unwrap();

        let repo = MenuItemRepository::new(db.db.clone());
        repo.update(&item_id, price_update(500.0)).await.unwrap();
        let payload = shared::message::SyncPayload {
            resource: "menu_item".into(),
            version: 1,
            action: "updated".into(),
            id: item_id.clone(),
            data: None,
        };
        bus.publish(BusMessage::sync(&payload)).unwrap();

        // 事件被压制：缓存保持旧解析，无提示
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!session.cache().is_empty());
        assert!(session.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_event_ignored() {
        let (_db, deps, bus, _item_id) = setup().await;
        let sessions = super::super::CheckoutSessions::new();
        let shopper = ShopperRef::Guest("g1".into());
        let session = sessions.open(&shopper, &deps, &bus).await.unwrap();

        let _ = super::super::session::build_quote(&deps, &session).await.unwrap();

        let payload = shared::message::SyncPayload {
            resource: "menu_item".into(),
            version: 1,
            action: "updated".into(),
            id: "menu_item:someone_else".into(),
            data: None,
        };
        bus.publish(BusMessage::sync(&payload)).unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!session.cache().is_empty());
        assert!(session.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_stops_listener() {
        let (_db, deps, bus, _item_id) = setup().await;
        let sessions = super::super::CheckoutSessions::new();
        let shopper = ShopperRef::Guest("g1".into());
        let session = sessions.open(&shopper, &deps, &bus).await.unwrap();

        assert!(bus.subscriber_count() >= 1);
        sessions.close(&shopper.storage_key());
        drop(session);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(bus.subscriber_count(), 0);
    }
}
