//! 消息总线核心实现
//!
//! # 消息流
//!
//! ```text
//! Handler ──▶ publish() ──▶ broadcast::Sender ──┬──▶ CheckoutListener (per session)
//!                                               └──▶ 其他订阅方
//! ```
//!
//! 订阅方都在进程内；变更事件的网络投递 (若有) 由外部层负责。
//! 慢订阅方会收到 `Lagged`，自行重新订阅 (见 checkout::listeners)。

use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::utils::AppError;

/// 广播通道默认容量
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// 消息总线 - 负责变更消息的发布与订阅
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 服务器到订阅方的广播通道
    server_tx: broadcast::Sender<BusMessage>,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
}

impl MessageBus {
    /// 创建默认容量的消息总线
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 创建指定容量的消息总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (server_tx, _) = broadcast::channel(capacity);
        Self {
            server_tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 发布消息 (服务器 -> 所有订阅者)
    ///
    /// 没有订阅者时不算错误；变更广播是 best-effort。
    pub fn publish(&self, msg: BusMessage) -> Result<(), AppError> {
        match self.server_tx.send(msg) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// 订阅服务器广播
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.server_tx.receiver_count()
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭消息总线
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::SyncPayload;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe();

        let payload = SyncPayload {
            resource: "menu_item".into(),
            version: 1,
            action: "updated".into(),
            id: "menu_item:x".into(),
            data: None,
        };
        bus.publish(BusMessage::sync(&payload)).unwrap();

        let msg = rx.recv().await.unwrap();
        let decoded: SyncPayload = msg.decode().unwrap();
        assert_eq!(decoded.resource, "menu_item");
        assert_eq!(decoded.version, 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = MessageBus::new();
        let payload = SyncPayload {
            resource: "address".into(),
            version: 1,
            action: "created".into(),
            id: "address:x".into(),
            data: None,
        };
        assert!(bus.publish(BusMessage::sync(&payload)).is_ok());
    }
}
