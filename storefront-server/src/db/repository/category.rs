//! Category Repository

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::models::{Category, CategoryCreate, CategoryUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const CATEGORY_TABLE: &str = "category";

#[derive(Clone)]
pub struct CategoryRepository {
    base: BaseRepository,
}

impl CategoryRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active categories
    pub async fn find_all(&self) -> RepoResult<Vec<Category>> {
        let categories: Vec<Category> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM category WHERE is_active = true ORDER BY sort_order")
            .await?
            .take(0)?;
        Ok(categories)
    }

    /// Find category by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Category>> {
        let key = strip_table_prefix(CATEGORY_TABLE, id).to_string();
        let category: Option<Category> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
            .bind(("tb", CATEGORY_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        Ok(category)
    }

    /// Create a new category
    pub async fn create(&self, data: CategoryCreate) -> RepoResult<Category> {
        let key = new_record_key();
        let category = Category {
            id: None,
            name: data.name,
            description: data.description,
            image: data.image,
            sort_order: data.sort_order.unwrap_or(0),
            is_active: true,
        };

        let created: Option<Category> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", CATEGORY_TABLE))
            .bind(("key", key))
            .bind(("data", category))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create category".to_string()))
    }

    /// Update a category
    pub async fn update(&self, id: &str, data: CategoryUpdate) -> RepoResult<Category> {
        let key = strip_table_prefix(CATEGORY_TABLE, id).to_string();

        // Build dynamic SET clauses so absent fields stay untouched
        let mut set_parts: Vec<&str> = Vec::new();
        if data.name.is_some() { set_parts.push("name = $name"); }
        if data.description.is_some() { set_parts.push("description = $description"); }
        if data.image.is_some() { set_parts.push("image = $image"); }
        if data.sort_order.is_some() { set_parts.push("sort_order = $sort_order"); }
        if data.is_active.is_some() { set_parts.push("is_active = $is_active"); }

        if set_parts.is_empty() {
            return self
                .find_by_id(&key)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Category {} not found", id)));
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
            .bind(("tb", CATEGORY_TABLE))
            .bind(("key", key));

        if let Some(v) = data.name { query = query.bind(("name", v)); }
        if let Some(v) = data.description { query = query.bind(("description", v)); }
        if let Some(v) = data.image { query = query.bind(("image", v)); }
        if let Some(v) = data.sort_order { query = query.bind(("sort_order", v)); }
        if let Some(v) = data.is_active { query = query.bind(("is_active", v)); }

        let updated: Option<Category> = query.await?.take(1)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Category {} not found", id)))
    }

    /// Hard delete a category
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let key = strip_table_prefix(CATEGORY_TABLE, id).to_string();
        let deleted: Option<Category> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key); DELETE type::thing($tb, $key);")
            .bind(("tb", CATEGORY_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        if deleted.is_none() {
            return Err(RepoError::NotFound(format!("Category {} not found", id)));
        }
        Ok(())
    }
}
