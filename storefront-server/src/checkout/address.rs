//! Address Manager
//!
//! 结账地址有两种来源：地址簿选取与手工录入。
//! 两者都归一成同一个 [`AddressForm`]，下游只处理一种形状。
//!
//! 校验是字段级的：一次返回全部缺失字段，不允许部分提交。
//! phone 只在手工录入模式必填 —— 旧的已存地址可能没有电话，
//! 仍然接受 (刻意的不对称规则)。

use serde::{Deserialize, Serialize};

use shared::models::{Address, OrderAddress};

use super::CheckoutError;

/// 地址来源模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// 地址簿选取 (允许缺 phone)
    Saved,
    /// 手工录入 (phone 必填)
    Manual,
}

/// 归一化的地址表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AddressForm {
    /// 由已存地址预填表单
    pub fn from_saved(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            region: address.region.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        }
    }
}

/// 校验并产出订单地址快照
///
/// 失败时返回完整的缺失字段列表，下单被阻塞直到全部补齐。
pub fn validate(form: &AddressForm, mode: AddressMode) -> Result<OrderAddress, CheckoutError> {
    let mut missing = Vec::new();

    let required = [
        ("full_name", &form.full_name),
        ("line1", &form.line1),
        ("city", &form.city),
        ("region", &form.region),
        ("postal_code", &form.postal_code),
        ("country", &form.country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            missing.push(field.to_string());
        }
    }

    // phone 只在手工录入时必填
    if mode == AddressMode::Manual
        && form.phone.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        missing.push("phone".to_string());
    }

    if !missing.is_empty() {
        return Err(CheckoutError::AddressInvalid(missing));
    }

    Ok(OrderAddress {
        full_name: form.full_name.trim().to_string(),
        line1: form.line1.trim().to_string(),
        line2: form.line2.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
        city: form.city.trim().to_string(),
        region: form.region.trim().to_string(),
        postal_code: form.postal_code.trim().to_string(),
        country: form.country.trim().to_string(),
        phone: form.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
    })
}
