//! 消息总线消息类型定义
//!
//! 这些类型在 storefront-server 内部的变更广播与订阅方之间共享。
//! 每个写操作完成后发布一条 Sync 消息；结账监听器据此刷新数据。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 消息总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 系统通知
    Notification = 0,
    /// 资源变更同步信号
    Sync = 1,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Notification => write!(f, "notification"),
            EventType::Sync => write!(f, "sync"),
        }
    }
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// 构造同步信号消息
    pub fn sync(payload: &SyncPayload) -> Self {
        Self::encode(EventType::Sync, payload)
    }

    /// 构造通知消息
    pub fn notification(payload: &NotificationPayload) -> Self {
        Self::encode(EventType::Notification, payload)
    }

    fn encode<T: Serialize>(event_type: EventType, payload: &T) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            // 进程内消息，序列化失败只可能是编程错误
            payload: serde_json::to_vec(payload).unwrap_or_default(),
        }
    }

    /// 解码业务载荷
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_message_roundtrip() {
        let payload = SyncPayload {
            resource: "menu_item".into(),
            version: 3,
            action: "updated".into(),
            id: "menu_item:abc".into(),
            data: None,
        };
        let msg = BusMessage::sync(&payload);
        assert_eq!(msg.event_type, EventType::Sync);
        let decoded: SyncPayload = msg.decode().unwrap();
        assert_eq!(decoded, payload);
    }
}
