//! Discount Code Repository
//!
//! 码值存储为大写并有唯一索引。用量记录依赖
//! (code, order_id) 唯一索引实现恰好一次。

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::models::{DiscountCode, DiscountCodeCreate, DiscountCodeUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const DISCOUNT_TABLE: &str = "discount_code";

#[derive(Clone)]
pub struct DiscountRepository {
    base: BaseRepository,
}

impl DiscountRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// All codes (management listing)
    pub async fn find_all(&self) -> RepoResult<Vec<DiscountCode>> {
        let codes: Vec<DiscountCode> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM discount_code ORDER BY code")
            .await?
            .take(0)?;
        Ok(codes)
    }

    /// Look up an active code by its value (case-insensitive)
    pub async fn find_by_code(&self, code: &str) -> RepoResult<Option<DiscountCode>> {
        let code = code.trim().to_uppercase();
        let codes: Vec<DiscountCode> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM discount_code WHERE code = $code AND is_active = true")
            .bind(("code", code))
            .await?
            .take(0)?;
        Ok(codes.into_iter().next())
    }

    /// Create a code
    pub async fn create(&self, data: DiscountCodeCreate) -> RepoResult<DiscountCode> {
        let key = new_record_key();
        let discount = DiscountCode {
            id: None,
            code: data.code.trim().to_uppercase(),
            kind: data.kind,
            value: data.value,
            is_active: true,
            min_subtotal: data.min_subtotal,
            expires_at: data.expires_at,
        };

        let created: Option<DiscountCode> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", DISCOUNT_TABLE))
            .bind(("key", key))
            .bind(("data", discount))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create discount code".to_string()))
    }

    /// Update a code
    pub async fn update(&self, id: &str, data: DiscountCodeUpdate) -> RepoResult<DiscountCode> {
        let key = strip_table_prefix(DISCOUNT_TABLE, id).to_string();

        let mut set_parts: Vec<&str> = Vec::new();
        if data.kind.is_some() { set_parts.push("kind = $kind"); }
        if data.value.is_some() { set_parts.push("value = $value"); }
        if data.is_active.is_some() { set_parts.push("is_active = $is_active"); }
        if data.min_subtotal.is_some() { set_parts.push("min_subtotal = $min_subtotal"); }
        if data.expires_at.is_some() { set_parts.push("expires_at = $expires_at"); }

        if set_parts.is_empty() {
            let found: Option<DiscountCode> = self
                .base
                .db()
                .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
                .bind(("tb", DISCOUNT_TABLE))
                .bind(("key", key))
                .await?
                .take(0)?;
            return found.ok_or_else(|| RepoError::NotFound(format!("Discount code {} not found", id)));
        }

        let query_str = format!(
            "UPDATE type::thing($tb, $key) SET {} RETURN NONE;
             SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            set_parts.join(", ")
        );

        let mut query = self
            .base
            .db()
            .query(&query_str)
            .bind(("tb", DISCOUNT_TABLE))
            .bind(("key", key));

        if let Some(v) = data.kind { query = query.bind(("kind", v)); }
        if let Some(v) = data.value { query = query.bind(("value", v)); }
        if let Some(v) = data.is_active { query = query.bind(("is_active", v)); }
        if let Some(v) = data.min_subtotal { query = query.bind(("min_subtotal", v)); }
        if let Some(v) = data.expires_at { query = query.bind(("expires_at", v)); }

        let updated: Option<DiscountCode> = query.await?.take(1)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Discount code {} not found", id)))
    }

    /// Record usage of a code against an order, exactly once
    ///
    /// 幂等：重复记录被唯一索引拒绝时返回 false。
    pub async fn record_usage(&self, code: &str, order_id: &str) -> RepoResult<bool> {
        let code = code.trim().to_uppercase();
        let order_id = order_id.to_string();
        let result = self
            .base
            .db()
            .query("CREATE discount_usage SET code = $code, order_id = $order_id, used_at = time::now() RETURN NONE")
            .bind(("code", code))
            .bind(("order_id", order_id))
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
