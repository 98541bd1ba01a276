//! Address Repository
//!
//! 地址簿。`is_default` 在同一 owner 下最多一条，
//! 设默认时先清掉其他条目的标记。

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::models::{Address, AddressCreate, AddressUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const ADDRESS_TABLE: &str = "address";

#[derive(Clone)]
pub struct AddressRepository {
    base: BaseRepository,
}

impl AddressRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// All addresses of an owner, default first
    pub async fn find_by_owner(&self, owner: &str) -> RepoResult<Vec<Address>> {
        let owner = owner.to_string();
        let addresses: Vec<Address> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM address WHERE owner = $owner ORDER BY is_default DESC")
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(addresses)
    }

    /// Single address, scoped to its owner
    pub async fn find_by_id(&self, owner: &str, id: &str) -> RepoResult<Option<Address>> {
        let key = strip_table_prefix(ADDRESS_TABLE, id).to_string();
        let owner = owner.to_string();
        let addresses: Vec<Address> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner")
            .bind(("tb", ADDRESS_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(addresses.into_iter().next())
    }

    /// Default address of an owner, if any
    pub async fn find_default(&self, owner: &str) -> RepoResult<Option<Address>> {
        let owner = owner.to_string();
        let addresses: Vec<Address> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM address WHERE owner = $owner AND is_default = true")
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(addresses.into_iter().next())
    }

    /// Create an address
    pub async fn create(&self, owner: &str, data: AddressCreate) -> RepoResult<Address> {
        let is_default = data.is_default.unwrap_or(false);
        if is_default {
            self.clear_default(owner).await?;
        }

        let key = new_record_key();
        let address = Address {
            id: None,
            owner: owner.to_string(),
            full_name: data.full_name,
            line1: data.line1,
            line2: data.line2,
            city: data.city,
            region: data.region,
            postal_code: data.postal_code,
            country: data.country,
            phone: data.phone,
            is_default,
        };

        let created: Option<Address> = self
            .base
            .db()
            .query(
                "CREATE type::thing($tb, $key) CONTENT $data RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", ADDRESS_TABLE))
            .bind(("key", key))
            .bind(("data", address))
            .await?
            .take(1)?;

        created.ok_or_else(|| RepoError::Database("Failed to create address".to_string()))
    }

    /// Update an address (owner scoped)
    pub async fn update(&self, owner: &str, id: &str, data: AddressUpdate) -> RepoResult<Address> {
        if data.is_default == Some(true) {
            self.clear_default(owner).await?;
        }

        let key = strip_table_prefix(ADDRESS_TABLE, id).to_string();

        let mut set_parts: Vec<&str> = Vec::new();
        if data.full_name.is_some() { set_parts.push("full_name = $full_name"); }
        if data.line1.is_some() { set_parts.push("line1 = $line1"); }
        if data.line2.is_some() { set_parts.push("line2 = $line2"); }
        if data.city.is_some() { set_parts.push("city = $city"); }
        if data.region.is_some() { set_parts.push("region = $region"); }
        if data.postal_code.is_some() { set_parts.push("postal_code = $postal_code"); }
        if data.country.is_some() { set_parts.push("country = $country"); }
        if data.phone.is_some() { set_parts.push("phone = $phone"); }
        if data.is_default.is_some() { set_parts.push("is_default = $is_default"); }

        if set_parts.is_empty() {
            return self
                .find_by_id(owner, &key)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Address {} not found", id)));
        }

        let query_str = format!(
            "UPDATE type::thing($tb, $key) SET {} WHERE owner = $owner RETURN NONE;
             SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner;",
            set_parts.join(", ")
        );

        let mut query = self
            .base
            .db()
            .query(&query_str)
            .bind(("tb", ADDRESS_TABLE))
            .bind(("key", key))
            .bind(("owner", owner.to_string()));

        if let Some(v) = data.full_name { query = query.bind(("full_name", v)); }
        if let Some(v) = data.line1 { query = query.bind(("line1", v)); }
        if let Some(v) = data.line2 { query = query.bind(("line2", v)); }
        if let Some(v) = data.city { query = query.bind(("city", v)); }
        if let Some(v) = data.region { query = query.bind(("region", v)); }
        if let Some(v) = data.postal_code { query = query.bind(("postal_code", v)); }
        if let Some(v) = data.country { query = query.bind(("country", v)); }
        if let Some(v) = data.phone { query = query.bind(("phone", v)); }
        if let Some(v) = data.is_default { query = query.bind(("is_default", v)); }

        let updated: Vec<Address> = query.await?.take(1)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Address {} not found", id)))
    }

    /// Delete an address (owner scoped)
    pub async fn delete(&self, owner: &str, id: &str) -> RepoResult<()> {
        let key = strip_table_prefix(ADDRESS_TABLE, id).to_string();
        let owner = owner.to_string();
        let existing: Vec<Address> = self
            .base
            .db()
            .query(
                "SELECT *, type::string(id) AS id FROM type::thing($tb, $key) WHERE owner = $owner;
                 DELETE type::thing($tb, $key) WHERE owner = $owner;",
            )
            .bind(("tb", ADDRESS_TABLE))
            .bind(("key", key))
            .bind(("owner", owner))
            .await?
            .take(0)?;
        if existing.is_empty() {
            return Err(RepoError::NotFound(format!("Address {} not found", id)));
        }
        Ok(())
    }

    async fn clear_default(&self, owner: &str) -> RepoResult<()> {
        let owner = owner.to_string();
        self.base
            .db()
            .query("UPDATE address SET is_default = false WHERE owner = $owner AND is_default = true")
            .bind(("owner", owner))
            .await?
            .check()?;
        Ok(())
    }
}
