//! Database Module
//!
//! 嵌入式 SurrealDB (RocksDB 引擎)。表结构无模式，
//! 唯一性约束通过启动时定义的索引保证。

pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

use crate::utils::AppError;

/// Database service — owns the embedded SurrealDB instance
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Create a new database service backed by RocksDB at the given path
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        Self::init(db).await
    }

    /// In-memory database (tests)
    pub async fn new_in_memory() -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<surrealdb::engine::local::Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns("storefront")
            .use_db("main")
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        // 唯一索引：
        // - 折扣码值唯一
        // - 折扣用量 (code, order) 恰好一次 —— 下单重试不得重复计量
        // - 支付回调事件幂等处理
        db.query(
            "DEFINE INDEX IF NOT EXISTS uniq_discount_code ON TABLE discount_code COLUMNS code UNIQUE;
             DEFINE INDEX IF NOT EXISTS uniq_discount_usage ON TABLE discount_usage COLUMNS code, order_id UNIQUE;
             DEFINE INDEX IF NOT EXISTS uniq_webhook_event ON TABLE processed_webhook_event COLUMNS event_id UNIQUE;",
        )
        .await
        .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?
        .check()
        .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;

        tracing::info!("Database connection established (embedded SurrealDB)");

        Ok(Self { db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::WebhookEventRepository;

    #[tokio::test]
    async fn test_open_on_disk_database() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("storefront.db");
        let svc = DbService::new(&path.to_string_lossy()).await.unwrap();
        drop(svc);
    }

    #[tokio::test]
    async fn test_webhook_event_unique_index() {
        let svc = DbService::new_in_memory().await.unwrap();
        let repo = WebhookEventRepository::new(svc.db.clone());

        assert!(repo.record("evt_1", "payment_intent.succeeded").await.unwrap());
        // 重复事件被唯一索引拒绝
        assert!(!repo.record("evt_1", "payment_intent.succeeded").await.unwrap());
        assert!(repo.record("evt_2", "payment_intent.succeeded").await.unwrap());
    }

    #[tokio::test]
    async fn test_discount_usage_unique_per_order() {
        let svc = DbService::new_in_memory().await.unwrap();
        let repo = crate::db::repository::DiscountRepository::new(svc.db.clone());

        assert!(repo.record_usage("SAVE10", "order:a").await.unwrap());
        assert!(!repo.record_usage("SAVE10", "order:a").await.unwrap());
        // 同码不同订单可以再次使用
        assert!(repo.record_usage("SAVE10", "order:b").await.unwrap());
    }
}
