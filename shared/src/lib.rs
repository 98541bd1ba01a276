//! Storefront Shared - 餐厅在线点餐系统共享类型
//!
//! 本 crate 在 storefront-server 和客户端之间共享：
//!
//! - **数据模型** (`models`): 菜单、购物车、地址、订单等表结构
//! - **结账类型** (`checkout`): 商品解析、总价、支付状态机
//! - **消息类型** (`message`): 变更同步信号和通知载荷

pub mod checkout;
pub mod message;
pub mod models;
pub mod types;

// Re-export 公共类型
pub use checkout::{OrderTotals, PaymentPhase, ProductRef, ResolvedProduct, ResolvedSource};
pub use message::{BusMessage, EventType, NotificationPayload, SyncPayload};
pub use types::{ShopperRef, Timestamp};
