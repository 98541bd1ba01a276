//! Processed Webhook Event Repository
//!
//! 支付回调的幂等屏障：先插入，唯一索引冲突即视为重复事件。

use super::{BaseRepository, RepoError, RepoResult};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct WebhookEventRepository {
    base: BaseRepository,
}

impl WebhookEventRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Record an event id; returns false if it was already processed
    pub async fn record(&self, event_id: &str, event_type: &str) -> RepoResult<bool> {
        let event_id = event_id.to_string();
        let event_type = event_type.to_string();
        let result = self
            .base
            .db()
            .query(
                "CREATE processed_webhook_event SET event_id = $event_id, event_type = $event_type, processed_at = time::now() RETURN NONE",
            )
            .bind(("event_id", event_id))
            .bind(("event_type", event_type))
            .await?
            .check();

        match result {
            Ok(_) => Ok(true),
            Err(e) => match RepoError::from(e) {
                RepoError::Duplicate(_) => Ok(false),
                other => Err(other),
            },
        }
    }
}
