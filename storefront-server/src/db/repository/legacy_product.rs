//! Legacy Product Repository
//!
//! 只读：最早一代商品表，仅供购物车行解析。

use super::{BaseRepository, RepoResult, strip_table_prefix};
use shared::models::LegacyProduct;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const LEGACY_PRODUCT_TABLE: &str = "legacy_product";

#[derive(Clone)]
pub struct LegacyProductRepository {
    base: BaseRepository,
}

impl LegacyProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find legacy product by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<LegacyProduct>> {
        let key = strip_table_prefix(LEGACY_PRODUCT_TABLE, id).to_string();
        let product: Option<LegacyProduct> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
            .bind(("tb", LEGACY_PRODUCT_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        Ok(product)
    }
}
