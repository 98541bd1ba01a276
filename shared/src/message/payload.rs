use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// 普通信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// 通知分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// 系统级通知
    System,
    /// 结账相关（价格变动、商品下架等）
    Checkout,
    /// 业务相关（订单、支付）
    Business,
}

// ==================== Payloads ====================

/// 通知载荷 (服务端 -> 订阅方)
///
/// 用于向用户展示非阻塞提示，例如结账期间的
/// "价格已变动" 或 "商品已下架"。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 标题
    pub title: String,
    /// 消息内容
    pub message: String,
    /// 通知级别
    pub level: NotificationLevel,
    /// 通知分类
    pub category: NotificationCategory,
    /// 附加数据 (JSON)
    pub data: Option<serde_json::Value>,
}

/// 同步信号载荷 (服务端 -> 所有订阅方)
///
/// 当某个资源发生变更时，服务端广播此信号，
/// 通知所有感兴趣的订阅方刷新数据。
///
/// # 示例
/// - `resource`: "menu_item"
/// - `version`: 42
/// - `action`: "updated"
/// - `id`: "menu_item:abc"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// 资源类型 (例如: "menu_item", "address", "order")
    pub resource: String,
    /// 版本号 (按资源类型单调递增，用于判断数据新旧)
    pub version: u64,
    /// 变更类型 ("created", "updated", "deleted")
    pub action: String,
    /// 资源 ID
    pub id: String,
    /// 资源数据 (deleted 时为 None)
    pub data: Option<serde_json::Value>,
}
