//! Legacy Product Model
//!
//! 最早的商品表，字段命名与后来两代不同。只读。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    /// 单价 (货币单位)
    pub unit_price: f64,
    #[serde(default)]
    pub photo: Option<String>,
    /// 库存数；0 视为不可售
    #[serde(default)]
    pub in_stock: i32,
}
