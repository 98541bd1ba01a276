//! Wishlist Repository

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::ProductRef;
use shared::models::WishlistEntry;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const WISHLIST_TABLE: &str = "wishlist_entry";

#[derive(Clone)]
pub struct WishlistRepository {
    base: BaseRepository,
}

impl WishlistRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Wishlist of an owner, newest first
    pub async fn find_by_owner(&self, owner: &str) -> RepoResult<Vec<WishlistEntry>> {
        let owner = owner.to_string();
        let entries: Vec<WishlistEntry> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM wishlist_entry WHERE owner = $owner ORDER BY added_at DESC")
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(entries)
    }

    /// Add an entry (幂等：同商品已在心愿单时返回已有条目)
    pub async fn add(&self, owner: &str, product_ref: ProductRef) -> RepoResult<WishlistEntry> {
        let existing = self.find_by_owner(owner).await?;
        if let Some(entry) = existing.into_iter().find(|e| e.product_ref == product_ref) {
            return Ok(entry);
        }

        let key = new_record_key();
        let entry = WishlistEntry {
            id: None,
            owner: owner.to_string(),
            product_ref,
            added_at: chrono::Utc::now().timestamp_millis(),
        };

        let created: Option<WishlistEntry> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", WISHLIST_TABLE))
            .bind(("key", key))
            .bind(("data", entry))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create wishlist entry".to_string()))
    }

    /// Remove an entry (owner scoped)
    pub async fn remove(&self, owner: &str, id: &str) -> RepoResult<()> {
        let key = strip_table_prefix(WISHLIST_TABLE, id).to_string();
        let owner = owner.to_string();
        let existing: Vec<WishlistEntry> = self
            .base
            .db()
            .query(
                "SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner;
                 DELETE type::thing($tb, $key) WHERE owner = $owner;",
            )
            .bind(("tb", WISHLIST_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .await?
            .take(0)?;
        if existing.is_empty() {
            return Err(RepoError::NotFound(format!("Wishlist entry {} not found", id)));
        }
        Ok(())
    }
}
