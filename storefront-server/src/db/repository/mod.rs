//! Repository Module
//!
//! Provides CRUD operations for SurrealDB tables.

// Catalog
pub mod category;
pub mod dish;
pub mod legacy_product;
pub mod menu_item;

// Shopper
pub mod address;
pub mod cart;
pub mod wishlist;

// Checkout
pub mod discount;
pub mod order;
pub mod webhook_event;

// Storefront extras
pub mod reservation;
pub mod review;

// System
pub mod settings;

// Re-exports
pub use address::AddressRepository;
pub use cart::CartRepository;
pub use category::CategoryRepository;
pub use discount::DiscountRepository;
pub use dish::DishRepository;
pub use legacy_product::LegacyProductRepository;
pub use menu_item::MenuItemRepository;
pub use order::OrderRepository;
pub use reservation::ReservationRepository;
pub use review::ReviewRepository;
pub use settings::SettingsRepository;
pub use webhook_event::WebhookEventRepository;
pub use wishlist::WishlistRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// 原子创建事务被 THROW 拒绝，消息原样保留
    #[error("{0}")]
    Rejected(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        // 唯一索引冲突按 Duplicate 分类，调用方可据此实现幂等
        if msg.contains("already contains") || msg.contains("index `uniq_") {
            RepoError::Duplicate(msg)
        } else {
            RepoError::Database(msg)
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID Convention: 全栈统一使用 "table:key" 字符串格式
// =============================================================================
//
// - 记录键在 Rust 侧生成 (uuid v4 simple)
// - 读取时查询投影 `type::string(id) AS id`，模型里的 id 始终是字符串
// - 访问记录用 `type::thing($tb, $key)`，key 为去掉表前缀的纯键

/// 生成新的记录键
pub fn new_record_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// 去掉 "table:" 前缀，返回纯键
pub fn strip_table_prefix<'a>(table: &str, id: &'a str) -> &'a str {
    id.strip_prefix(&format!("{table}:")).unwrap_or(id)
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_table_prefix() {
        assert_eq!(strip_table_prefix("menu_item", "menu_item:abc"), "abc");
        assert_eq!(strip_table_prefix("menu_item", "abc"), "abc");
        // 不剥除其他表的前缀
        assert_eq!(strip_table_prefix("menu_item", "dish:abc"), "dish:abc");
    }
}
