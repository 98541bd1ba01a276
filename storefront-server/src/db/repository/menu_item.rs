//! Menu Item Repository

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const MENU_ITEM_TABLE: &str = "menu_item";

#[derive(Clone)]
pub struct MenuItemRepository {
    base: BaseRepository,
}

impl MenuItemRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active menu items
    pub async fn find_all(&self) -> RepoResult<Vec<MenuItem>> {
        let items: Vec<MenuItem> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM menu_item WHERE is_active = true ORDER BY sort_order")
            .await?
            .take(0)?;
        Ok(items)
    }

    /// Find active menu items in a category
    pub async fn find_by_category(&self, category_id: &str) -> RepoResult<Vec<MenuItem>> {
        let category_id = category_id.to_string();
        let items: Vec<MenuItem> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM menu_item WHERE category = $cat AND is_active = true ORDER BY sort_order")
            .bind(("cat", category_id))
            .await?
            .take(0)?;
        Ok(items)
    }

    /// Find menu item by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<MenuItem>> {
        let key = strip_table_prefix(MENU_ITEM_TABLE, id).to_string();
        let item: Option<MenuItem> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
            .bind(("tb", MENU_ITEM_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        Ok(item)
    }

    /// Create a new menu item
    pub async fn create(&self, data: MenuItemCreate) -> RepoResult<MenuItem> {
        let variants = data.variants.unwrap_or_default();
        let combinations = data.combinations.unwrap_or_default();

        // 单维规格与多维组合互斥
        if !variants.is_empty() && !combinations.is_empty() {
            return Err(RepoError::Validation(
                "variants and combinations are mutually exclusive".into(),
            ));
        }
        // 最多一个默认规格
        if variants.iter().filter(|v| v.is_default).count() > 1 {
            return Err(RepoError::Validation("only one default variant allowed".into()));
        }

        let key = new_record_key();
        let item = MenuItem {
            id: None,
            name: data.name,
            description: data.description,
            image: data.image,
            category: data.category,
            price: data.price,
            is_available: true,
            sort_order: data.sort_order.unwrap_or(0),
            is_active: true,
            variants,
            combinations,
        };

        let created: Option<MenuItem> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", MENU_ITEM_TABLE))
            .bind(("key", key))
            .bind(("data", item))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create menu item".to_string()))
    }

    /// Update a menu item
    pub async fn update(&self, id: &str, data: MenuItemUpdate) -> RepoResult<MenuItem> {
        if let (Some(variants), Some(combinations)) = (&data.variants, &data.combinations)
            && !variants.is_empty()
            && !combinations.is_empty()
        {
            return Err(RepoError::Validation(
                "variants and combinations are mutually exclusive".into(),
            ));
        }

        let key = strip_table_prefix(MENU_ITEM_TABLE, id).to_string();

        let mut set_parts: Vec<&str> = Vec::new();
        if data.name.is_some() { set_parts.push("name = $name"); }
        if data.description.is_some() { set_parts.push("description = $description"); }
        if data.image.is_some() { set_parts.push("image = $image"); }
        if data.category.is_some() { set_parts.push("category = $category"); }
        if data.price.is_some() { set_parts.push("price = $price"); }
        if data.is_available.is_some() { set_parts.push("is_available = $is_available"); }
        if data.sort_order.is_some() { set_parts.push("sort_order = $sort_order"); }
        if data.is_active.is_some() { set_parts.push("is_active = $is_active"); }
        if data.variants.is_some() { set_parts.push("variants = $variants"); }
        if data.combinations.is_some() { set_parts.push("combinations = $combinations"); }

        if set_parts.is_empty() {
            return self
                .find_by_id(&key)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Menu item {} not found", id)));
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
            .bind(("tb", MENU_ITEM_TABLE))
            .bind(("key", key));

        if let Some(v) = data.name { query = query.bind(("name", v)); }
        if let Some(v) = data.description { query = query.bind(("description", v)); }
        if let Some(v) = data.image { query = query.bind(("image", v)); }
        if let Some(v) = data.category { query = query.bind(("category", v)); }
        if let Some(v) = data.price { query = query.bind(("price", v)); }
        if let Some(v) = data.is_available { query = query.bind(("is_available", v)); }
        if let Some(v) = data.sort_order { query = query.bind(("sort_order", v)); }
        if let Some(v) = data.is_active { query = query.bind(("is_active", v)); }
        if let Some(v) = data.variants { query = query.bind(("variants", v)); }
        if let Some(v) = data.combinations { query = query.bind(("combinations", v)); }

        let updated: Option<MenuItem> = query.await?.take(1)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Menu item {} not found", id)))
    }

    /// Hard delete a menu item
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let key = strip_table_prefix(MENU_ITEM_TABLE, id).to_string();
        let existing: Option<MenuItem> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key); DELETE type::thing($tb, $key);")
            .bind(("tb", MENU_ITEM_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        if existing.is_none() {
            return Err(RepoError::NotFound(format!("Menu item {} not found", id)));
        }
        Ok(())
    }
}
