//! Cart Repository
//!
//! 购物车行按 owner (user:xxx / guest:xxx) 存取。
//! 下单成功后的清空由结账流程调用 [`CartRepository::clear_owner`]。

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::models::{CartLine, CartSnapshot, VariantSelection};
use shared::ProductRef;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const CART_TABLE: &str = "cart_line";

#[derive(Clone)]
pub struct CartRepository {
    base: BaseRepository,
}

impl CartRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// All lines for an owner, oldest first
    pub async fn find_by_owner(&self, owner: &str) -> RepoResult<Vec<CartLine>> {
        let owner = owner.to_string();
        let lines: Vec<CartLine> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM cart_line WHERE owner = $owner ORDER BY added_at")
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(lines)
    }

    /// Single line, scoped to its owner
    pub async fn find_line(&self, owner: &str, id: &str) -> RepoResult<Option<CartLine>> {
        let key = strip_table_prefix(CART_TABLE, id).to_string();
        let owner = owner.to_string();
        let lines: Vec<CartLine> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner")
            .bind(("tb", CART_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(lines.into_iter().next())
    }

    /// Add a line
    ///
    /// 同商品同规格已在车中时合并数量，否则新建一行。
    /// `snapshot`/`price_at_add` 由调用方在加购时捕获。
    pub async fn add_line(
        &self,
        owner: &str,
        product_ref: ProductRef,
        quantity: i32,
        selection: Option<VariantSelection>,
        price_at_add: Option<f64>,
        snapshot: Option<CartSnapshot>,
    ) -> RepoResult<CartLine> {
        if quantity < 1 {
            return Err(RepoError::Validation("quantity must be >= 1".into()));
        }

        // 合并同商品同规格的已有行
        let existing = self.find_by_owner(owner).await?;
        if let Some(line) = existing
            .iter()
            .find(|l| l.product_ref == product_ref && l.selection == selection)
            && let Some(id) = &line.id
        {
            return self.update_quantity(owner, id, line.quantity + quantity).await;
        }

        let key = new_record_key();
        let line = CartLine {
            id: None,
            owner: owner.to_string(),
            product_ref,
            quantity,
            selection,
            price_at_add,
            snapshot,
            added_at: chrono::Utc::now().timestamp_millis(),
        };

        let created: Option<CartLine> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", CART_TABLE))
            .bind(("key", key))
            .bind(("data", line))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create cart line".to_string()))
    }

    /// Change quantity of a line
    pub async fn update_quantity(&self, owner: &str, id: &str, quantity: i32) -> RepoResult<CartLine> {
        if quantity < 1 {
            return Err(RepoError::Validation("quantity must be >= 1".into()));
        }

        let key = strip_table_prefix(CART_TABLE, id).to_string();
        let owner = owner.to_string();
        let updated: Vec<CartLine> = self
            .base
            .db()
            .query(
                "UPDATE type::thing($tb, $key) SET quantity = $quantity WHERE owner = $owner RETURN NONE;
                 SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner;",
            )
            .bind(("tb", CART_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .bind(("quantity", quantity))
            .await?
            .take(1)?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Cart line {} not found", id)))
    }

    /// Remove a line
    pub async fn remove_line(&self, owner: &str, id: &str) -> RepoResult<()> {
        let key = strip_table_prefix(CART_TABLE, id).to_string();
        let owner = owner.to_string();
        let existing: Vec<CartLine> = self
            .base
            .db()
            .query(
                "SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner;
                 DELETE type::thing($tb, $key) WHERE owner = $owner;",
            )
            .bind(("tb", CART_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .await?
            .take(0)?;
        if existing.is_empty() {
            return Err(RepoError::NotFound(format!("Cart line {} not found", id)));
        }
        Ok(())
    }

    /// Remove every line of an owner (成功下单后的终态清空)
    pub async fn clear_owner(&self, owner: &str) -> RepoResult<()> {
        let owner = owner.to_string();
        self.base
            .db()
            .query("DELETE cart_line WHERE owner = $owner")
            .bind(("owner", owner))
            .await?
            .check()?;
        Ok(())
    }

    /// Merge a guest cart into a user cart (登录后调用)
    ///
    /// 同商品同规格相加数量，其余整行转移。访客行随后删除。
    pub async fn merge_into(&self, guest_owner: &str, user_owner: &str) -> RepoResult<Vec<CartLine>> {
        let guest_lines = self.find_by_owner(guest_owner).await?;

        for line in guest_lines {
            self.add_line(
                user_owner,
                line.product_ref,
                line.quantity,
                line.selection,
                line.price_at_add,
                line.snapshot,
            )
            .await?;
        }

        self.clear_owner(guest_owner).await?;
        self.find_by_owner(user_owner).await
    }
}
