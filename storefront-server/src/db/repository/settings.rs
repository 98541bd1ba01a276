//! Store Settings Repository
//!
//! 单条记录 `store_settings:main`；缺失时返回默认值。

use super::{BaseRepository, RepoResult};
use shared::models::{StoreSettings, StoreSettingsUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const SETTINGS_TABLE: &str = "store_settings";
const SETTINGS_KEY: &str = "main";

#[derive(Clone)]
pub struct SettingsRepository {
    base: BaseRepository,
}

impl SettingsRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Current settings, falling back to defaults when unset
    pub async fn get(&self) -> RepoResult<StoreSettings> {
        let settings: Option<StoreSettings> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
            .bind(("tb", SETTINGS_TABLE))
            .bind(("key", SETTINGS_KEY))
            .await?
            .take(0)?;
        Ok(settings.unwrap_or_default())
    }

    /// Merge updates into the settings record (upsert)
    pub async fn update(&self, data: StoreSettingsUpdate) -> RepoResult<StoreSettings> {
        // 以当前值(或默认值)为基础合并，保证记录完整
        let mut settings = self.get().await?;
        settings.id = None;

        if let Some(v) = data.store_name { settings.store_name = v; }
        if let Some(v) = data.delivery_fee { settings.delivery_fee = v; }
        if let Some(v) = data.free_delivery_threshold { settings.free_delivery_threshold = v; }
        if let Some(v) = data.tax_rate_percent { settings.tax_rate_percent = v; }
        if let Some(v) = data.currency { settings.currency = v; }
        if let Some(v) = data.is_delivery_enabled { settings.is_delivery_enabled = v; }

        let updated: Option<StoreSettings> = self
            .base
            .db()
            .query(
                "UPSERT type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", SETTINGS_TABLE))
            .bind(("key", SETTINGS_KEY))
            .bind(("data", settings))
            .await?
            .take(1)?;

        Ok(updated.unwrap_or_default())
    }
}
