//! Discount Code Model

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// 折扣类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// 按小计百分比
    Percentage,
    /// 固定金额
    Fixed,
}

/// 折扣码
///
/// 结账期间只读；用量在下单时针对订单记录一次
/// ((code, order) 唯一索引保证幂等)。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 码值，存储为大写
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage 时为百分比值 (10 = 10%)，Fixed 时为金额
    pub value: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// 小计低于此值不可用
    #[serde(default)]
    pub min_subtotal: Option<f64>,
    /// 过期时间 (Unix 毫秒)
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCodeCreate {
    pub code: String,
    pub kind: DiscountKind,
    pub value: f64,
    pub min_subtotal: Option<f64>,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCodeUpdate {
    pub kind: Option<DiscountKind>,
    pub value: Option<f64>,
    pub is_active: Option<bool>,
    pub min_subtotal: Option<f64>,
    pub expires_at: Option<Timestamp>,
}
