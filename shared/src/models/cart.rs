//! Cart Model
//!
//! 购物车行。访客与注册用户共用同一张表，`owner` 为
//! [`crate::ShopperRef::storage_key`] 的统一表示。
//! 行在加购时创建，改量时更新，移除或下单成功后销毁。

use serde::{Deserialize, Serialize};

use crate::checkout::ProductRef;
use crate::types::Timestamp;

/// 规格选择 - 单维规格与多维组合互斥，由类型保证
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VariantSelection {
    /// 单维规格 ID
    Variant(String),
    /// 多维组合 ID
    Combination(String),
}

/// 加购时捕获的商品快照
///
/// 权威记录被删除或外键断裂时，解析回退链用它维持结账可用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub name: String,
    /// 加购时单价 (货币单位)
    pub price: f64,
    pub image: Option<String>,
    pub variant_name: Option<String>,
}

/// 购物车行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 所属购物者 (user:xxx 或 guest:xxx)
    pub owner: String,
    pub product_ref: ProductRef,
    /// 数量，恒 >= 1
    pub quantity: i32,
    /// 选中的规格或组合
    #[serde(default)]
    pub selection: Option<VariantSelection>,
    /// 加购时单价快照
    #[serde(default)]
    pub price_at_add: Option<f64>,
    /// 内嵌商品快照
    #[serde(default)]
    pub snapshot: Option<CartSnapshot>,
    pub added_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineCreate {
    pub product_ref: ProductRef,
    pub quantity: i32,
    pub selection: Option<VariantSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineUpdate {
    pub quantity: i32,
}
