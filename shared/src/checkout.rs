//! 结账共享类型
//!
//! 商品引用、解析结果、订单总价和支付阶段。
//! 这些类型在服务端结账流程和客户端展示之间共享。

use serde::{Deserialize, Serialize};

/// 商品引用 - 三个历史商品表的统一标签联合
///
/// 菜单项是当前的权威表；dish 和 legacy product 是两代旧表，
/// 购物车行仍可能引用它们。解析时按标签分发到对应的表。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProductRef {
    /// 当前菜单项表
    MenuItem(String),
    /// 旧版菜品表
    Dish(String),
    /// 更早的商品表
    Legacy(String),
}

impl ProductRef {
    /// 引用的记录 ID (不含表信息)
    pub fn id(&self) -> &str {
        match self {
            ProductRef::MenuItem(id) | ProductRef::Dish(id) | ProductRef::Legacy(id) => id,
        }
    }

    /// 引用的后备表名
    pub fn table(&self) -> &'static str {
        match self {
            ProductRef::MenuItem(_) => "menu_item",
            ProductRef::Dish(_) => "dish",
            ProductRef::Legacy(_) => "legacy_product",
        }
    }
}

/// 解析来源 - 标记 ResolvedProduct 出自回退链的哪一环
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedSource {
    /// 权威菜单项记录
    MenuItem,
    /// 旧版菜品记录
    Dish,
    /// 更早的商品记录
    Legacy,
    /// 加购时捕获的内嵌快照
    Snapshot,
    /// 最后兜底：由购物车行自身字段合成的占位商品
    Placeholder,
}

/// 解析后的商品视图 - 展示与计价的统一形状
///
/// 派生值，从不持久化。权威记录缺失时由回退链降级产生，
/// 所以 `available` 为 false 不代表错误。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedProduct {
    /// 商品 ID (来源记录的 ID，占位时为购物车行引用的 ID)
    pub id: String,
    pub name: String,
    /// 当前单价 (货币单位)
    pub current_price: f64,
    /// 是否可售
    pub available: bool,
    /// 图片 URL (外部对象存储)
    pub image: Option<String>,
    /// 选中的规格/组合名 (如 "大份" 或 "大份 · 芝心")
    pub variant_name: Option<String>,
    /// 出自回退链的哪一环
    pub source: ResolvedSource,
}

/// 订单总价 - 派生值对象
///
/// `grand_total = max(0, subtotal + delivery_fee + tax - discount)`，
/// 永不为负。金额为已舍入到两位小数的货币单位。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub grand_total: f64,
}

/// 支付阶段 - 结账会话的显式状态机
///
/// 所有导航/刷新副作用都查询当前阶段，
/// 而不是读一个松散的全局 "别把我重定向走" 布尔标记。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPhase {
    /// 未展示支付表单
    #[default]
    Idle,
    /// 支付表单已展示，等待处理器回调或重定向返回
    AwaitingPayment,
    /// 支付成功 (购物车已清空，但不得视为 "用户放弃结账")
    Succeeded,
    /// 支付失败 (订单与购物车保持原样，可重试)
    Failed,
}

impl PaymentPhase {
    /// 此阶段是否压制实时刷新监听
    ///
    /// 等待支付与支付成功期间忽略变更事件，避免与结账完成竞争。
    pub fn suppresses_refresh(&self) -> bool {
        matches!(self, PaymentPhase::AwaitingPayment | PaymentPhase::Succeeded)
    }

    /// "购物车为空" 是否仍意味着用户放弃了结账
    ///
    /// 成功态下购物车刚被清空，不能触发离开结账页的重定向。
    pub fn cart_empty_means_abandoned(&self) -> bool {
        !matches!(self, PaymentPhase::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ref_dispatch() {
        assert_eq!(ProductRef::MenuItem("a".into()).table(), "menu_item");
        assert_eq!(ProductRef::Dish("a".into()).table(), "dish");
        assert_eq!(ProductRef::Legacy("a".into()).table(), "legacy_product");
        assert_eq!(ProductRef::Dish("d9".into()).id(), "d9");
    }

    #[test]
    fn test_phase_suppression() {
        assert!(!PaymentPhase::Idle.suppresses_refresh());
        assert!(PaymentPhase::AwaitingPayment.suppresses_refresh());
        assert!(PaymentPhase::Succeeded.suppresses_refresh());
        assert!(!PaymentPhase::Failed.suppresses_refresh());
    }

    #[test]
    fn test_cart_empty_guard_only_in_succeeded() {
        assert!(PaymentPhase::Idle.cart_empty_means_abandoned());
        assert!(PaymentPhase::AwaitingPayment.cart_empty_means_abandoned());
        assert!(PaymentPhase::Failed.cart_empty_means_abandoned());
        assert!(!PaymentPhase::Succeeded.cart_empty_means_abandoned());
    }
}
