//! Legacy Dish Repository
//!
//! 只读：旧表不再接受写入，仅供购物车行解析。

use super::{BaseRepository, RepoResult, strip_table_prefix};
use shared::models::Dish;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const DISH_TABLE: &str = "dish";

#[derive(Clone)]
pub struct DishRepository {
    base: BaseRepository,
}

impl DishRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find dish by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Dish>> {
        let key = strip_table_prefix(DISH_TABLE, id).to_string();
        let dish: Option<Dish> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
            .bind(("tb", DISH_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        Ok(dish)
    }
}
