//! Order Model
//!
//! 订单在创建时原子写入 (头 + 行，全有或全无)，
//! 之后行/价格/地址快照不可变；后续商品改价不追溯已下订单。
//! 只有支付状态随支付流程推进。

use serde::{Deserialize, Serialize};

use crate::checkout::{OrderTotals, ProductRef};
use crate::types::Timestamp;

/// 支付状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    /// 订单已创建，款项未到 (支付句柄可能已签发)
    #[default]
    Unpaid,
    Paid,
    Failed,
}

/// 订单行 - 下单时的价格快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_ref: ProductRef,
    pub name: String,
    pub variant_name: Option<String>,
    /// 成交单价 (货币单位)
    pub unit_price: f64,
    pub quantity: i32,
    /// unit_price * quantity
    pub line_total: f64,
}

/// 订单地址快照 - 与地址簿条目生命周期无关
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// 订单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 下单者存储键 (user:xxx 或 guest:xxx)
    pub owner: Option<String>,
    /// 访客订单的联系邮箱
    pub guest_email: Option<String>,
    pub lines: Vec<OrderLine>,
    pub address: OrderAddress,
    pub totals: OrderTotals,
    /// 使用的折扣码 (码值)
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub payment_state: PaymentState,
    /// 支付处理器的授权句柄 ID
    #[serde(default)]
    pub payment_intent: Option<String>,
    pub placed_at: Timestamp,
}
