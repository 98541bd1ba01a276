//! Store Settings Model
//!
//! 结账经济参数。单条记录，缺失时使用默认值。

use serde::{Deserialize, Serialize};

/// 店铺设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub store_name: String,
    /// 配送费 (货币单位)
    pub delivery_fee: f64,
    /// 小计严格大于此值时免配送费
    pub free_delivery_threshold: f64,
    /// 税率百分比 (8 = 8%)，只对小计计税
    pub tax_rate_percent: f64,
    /// ISO 4217 货币码
    pub currency: String,
    #[serde(default = "default_true")]
    pub is_delivery_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            id: None,
            store_name: "Storefront".to_string(),
            delivery_fee: 50.0,
            free_delivery_threshold: 500.0,
            tax_rate_percent: 8.0,
            currency: "EUR".to_string(),
            is_delivery_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettingsUpdate {
    pub store_name: Option<String>,
    pub delivery_fee: Option<f64>,
    pub free_delivery_threshold: Option<f64>,
    pub tax_rate_percent: Option<f64>,
    pub currency: Option<String>,
    pub is_delivery_enabled: Option<bool>,
}
