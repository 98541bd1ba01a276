//! 消息模块 - 资源变更广播
//!
//! 每个写操作完成后通过 [`MessageBus`] 发布一条 Sync 消息；
//! 结账实时监听器与其他订阅方由此获得变更事件。

pub mod bus;

pub use bus::MessageBus;
pub use shared::message::{BusMessage, EventType};
