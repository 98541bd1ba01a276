//! Menu Item Model
//!
//! 当前权威商品表。单规格商品用 `variants` (一维，如 尺寸)，
//! 多维组合商品用 `combinations` (如 尺寸×饼底)，两者互斥。

use serde::{Deserialize, Serialize};

/// 单维规格 (如 "大份")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// 规格 ID (条目内唯一)
    pub id: String,
    pub name: String,
    /// 该规格的单价 (货币单位)
    pub price: f64,
    #[serde(default)]
    pub is_default: bool,
}

/// 多维组合 (如 "大份 · 芝心")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    /// 组合 ID (条目内唯一)
    pub id: String,
    /// 展示名，由各维度选项拼接
    pub name: String,
    pub price: f64,
}

/// 菜单项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// 所属分类 ID
    pub category: String,
    /// 基础单价；有规格/组合时为默认规格价
    pub price: f64,
    /// 是否可售 (售罄/下架时为 false)
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// 单维规格；与 combinations 互斥
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// 多维组合；与 variants 互斥
    #[serde(default)]
    pub combinations: Vec<Combination>,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    /// 查找指定单维规格
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// 查找指定多维组合
    pub fn combination(&self, combination_id: &str) -> Option<&Combination> {
        self.combinations.iter().find(|c| c.id == combination_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: String,
    pub price: f64,
    pub sort_order: Option<i32>,
    pub variants: Option<Vec<Variant>>,
    pub combinations: Option<Vec<Combination>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub is_available: Option<bool>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub variants: Option<Vec<Variant>>,
    pub combinations: Option<Vec<Combination>>,
}
