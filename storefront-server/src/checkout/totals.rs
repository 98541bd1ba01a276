//! Price/Total Calculator
//!
//! Pure functions mapping resolved cart lines to order totals.
//! Uses rust_decimal internally, rounds to 2 decimal places on exit.
//!
//! 规则：
//! - 小计严格大于阈值时免配送费，等于阈值仍收
//! - 税为小计的固定百分比 (不含配送费)
//! - 折扣最后扣除，结果以零为下限

use rust_decimal::prelude::*;

use shared::checkout::{OrderTotals, ResolvedProduct};
use shared::models::{DiscountCode, DiscountKind, StoreSettings};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// 订单行合计：单价 × 数量，舍入到两位小数 (存储边界)
pub fn line_total(unit_price: f64, quantity: i32) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// 小计：逐行 单价 × 数量
///
/// 中间值不舍入，避免逐行误差累积。
fn subtotal(lines: &[(&ResolvedProduct, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(product, quantity)| to_decimal(product.current_price) * Decimal::from(*quantity))
        .sum()
}

/// 折扣金额 (货币单位，未舍入)
///
/// Percentage 按小计计；Fixed 取码面值。不超过订单应付上限的
/// 截断由 [`calculate`] 的零下限完成。
fn discount_amount(subtotal: Decimal, code: Option<&DiscountCode>) -> Decimal {
    match code {
        Some(code) => match code.kind {
            DiscountKind::Percentage => subtotal * to_decimal(code.value) / Decimal::ONE_HUNDRED,
            DiscountKind::Fixed => to_decimal(code.value),
        },
        None => Decimal::ZERO,
    }
}

/// Calculate order totals from resolved lines
///
/// `grand_total = max(0, subtotal + delivery_fee + tax - discount)`
pub fn calculate(
    lines: &[(&ResolvedProduct, i32)],
    settings: &StoreSettings,
    code: Option<&DiscountCode>,
) -> OrderTotals {
    let subtotal = subtotal(lines);

    // 配送费：小计严格大于阈值时免除
    let delivery_fee = if !settings.is_delivery_enabled
        || subtotal > to_decimal(settings.free_delivery_threshold)
    {
        Decimal::ZERO
    } else {
        to_decimal(settings.delivery_fee)
    };

    // 税：只对小计计税，不含配送费
    let tax = subtotal * to_decimal(settings.tax_rate_percent) / Decimal::ONE_HUNDRED;

    let discount = discount_amount(subtotal, code);

    // 折扣最后扣，结果以零为下限
    let grand_total = (subtotal + delivery_fee + tax - discount).max(Decimal::ZERO);

    OrderTotals {
        subtotal: to_f64(subtotal),
        delivery_fee: to_f64(delivery_fee),
        tax: to_f64(tax),
        discount: to_f64(discount),
        grand_total: to_f64(grand_total),
    }
}

/// 折扣金额预览 (对给定小计)，舍入到两位小数
pub fn preview_discount(subtotal: f64, code: &DiscountCode) -> f64 {
    to_f64(discount_amount(to_decimal(subtotal), Some(code)))
}

/// 校验折扣码对给定小计是否可用
///
/// 返回拒绝原因；None 表示可用。
pub fn discount_rejection(code: &DiscountCode, subtotal: f64, now_ms: i64) -> Option<String> {
    if !code.is_active {
        return Some(format!("Discount code {} is no longer active", code.code));
    }
    if let Some(expires_at) = code.expires_at
        && now_ms > expires_at
    {
        return Some(format!("Discount code {} has expired", code.code));
    }
    if let Some(min) = code.min_subtotal
        && subtotal < min
    {
        return Some(format!(
            "Discount code {} requires a subtotal of at least {min:.2}",
            code.code
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::checkout::ResolvedSource;

    fn make_product(price: f64) -> ResolvedProduct {
        ResolvedProduct {
            id: "menu_item:test".to_string(),
            name: "Test".to_string(),
            current_price: price,
            available: true,
            image: None,
            variant_name: None,
            source: ResolvedSource::MenuItem,
        }
    }

    fn make_settings() -> StoreSettings {
        StoreSettings {
            delivery_fee: 50.0,
            free_delivery_threshold: 500.0,
            tax_rate_percent: 8.0,
            ..StoreSettings::default()
        }
    }

    fn make_code(kind: DiscountKind, value: f64) -> DiscountCode {
        DiscountCode {
            id: None,
            code: "TEST".to_string(),
            kind,
            value,
            is_active: true,
            min_subtotal: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_guest_checkout_scenario() {
        // cart = 2 × Margherita Pizza @450, threshold 500, fee 50, tax 8%
        let pizza = make_product(450.0);
        let totals = calculate(&[(&pizza, 2)], &make_settings(), None);

        assert_eq!(totals.subtotal, 900.0);
        assert_eq!(totals.delivery_fee, 0.0); // 900 > 500
        assert_eq!(totals.tax, 72.0);
        assert_eq!(totals.grand_total, 972.0);
    }

    #[test]
    fn test_discount_scenario() {
        // 同上，再减 100 固定折扣
        let pizza = make_product(450.0);
        let code = make_code(DiscountKind::Fixed, 100.0);
        let totals = calculate(&[(&pizza, 2)], &make_settings(), Some(&code));

        assert_eq!(totals.discount, 100.0);
        assert_eq!(totals.grand_total, 872.0);
    }

    #[test]
    fn test_delivery_fee_applies_at_or_below_threshold() {
        let settings = make_settings();

        // 小计恰好等于阈值：仍收配送费
        let product = make_product(500.0);
        let totals = calculate(&[(&product, 1)], &settings, None);
        assert_eq!(totals.delivery_fee, 50.0);

        // 小计低于阈值
        let product = make_product(100.0);
        let totals = calculate(&[(&product, 1)], &settings, None);
        assert_eq!(totals.delivery_fee, 50.0);

        // 小计刚好越过阈值
        let product = make_product(500.01);
        let totals = calculate(&[(&product, 1)], &settings, None);
        assert_eq!(totals.delivery_fee, 0.0);
    }

    #[test]
    fn test_grand_total_never_negative() {
        // 折扣超过 小计+配送费+税
        let product = make_product(10.0);
        let code = make_code(DiscountKind::Fixed, 10_000.0);
        let totals = calculate(&[(&product, 1)], &make_settings(), Some(&code));

        assert_eq!(totals.grand_total, 0.0);
    }

    #[test]
    fn test_percentage_discount_is_of_subtotal() {
        // 10% of 900 = 90，与配送费/税无关
        let pizza = make_product(450.0);
        let code = make_code(DiscountKind::Percentage, 10.0);
        let totals = calculate(&[(&pizza, 2)], &make_settings(), Some(&code));

        assert_eq!(totals.discount, 90.0);
        assert_eq!(totals.grand_total, 882.0);
    }

    #[test]
    fn test_tax_excludes_delivery_fee() {
        // 小计 100 (收配送费 50)；税 = 8% × 100，不是 8% × 150
        let product = make_product(100.0);
        let totals = calculate(&[(&product, 1)], &make_settings(), None);

        assert_eq!(totals.delivery_fee, 50.0);
        assert_eq!(totals.tax, 8.0);
        assert_eq!(totals.grand_total, 158.0);
    }

    #[test]
    fn test_discount_apply_then_remove_is_identity() {
        let pizza = make_product(450.0);
        let settings = make_settings();

        let baseline = calculate(&[(&pizza, 2)], &settings, None);
        let code = make_code(DiscountKind::Fixed, 100.0);
        let _with_discount = calculate(&[(&pizza, 2)], &settings, Some(&code));
        let removed = calculate(&[(&pizza, 2)], &settings, None);

        assert_eq!(baseline, removed);
    }

    #[test]
    fn test_delivery_disabled_waives_fee() {
        let mut settings = make_settings();
        settings.is_delivery_enabled = false;

        let product = make_product(100.0);
        let totals = calculate(&[(&product, 1)], &settings, None);
        assert_eq!(totals.delivery_fee, 0.0);
    }

    #[test]
    fn test_rounding_only_on_exit() {
        // 3 × 0.10 加 8% 税：中间不舍入
        // subtotal = 0.30, tax = 0.024 -> 0.02, grand = 0.30 + 50 + 0.024 = 50.324 -> 50.32
        let product = make_product(0.10);
        let totals = calculate(&[(&product, 3)], &make_settings(), None);

        assert_eq!(totals.subtotal, 0.30);
        assert_eq!(totals.tax, 0.02);
        assert_eq!(totals.grand_total, 50.32);
    }

    #[test]
    fn test_empty_lines_zero_totals_plus_fee() {
        let totals = calculate(&[], &make_settings(), None);
        assert_eq!(totals.subtotal, 0.0);
        // 空车不免配送费，但下单前会被 EmptyCart 拦截
        assert_eq!(totals.delivery_fee, 50.0);
    }

    #[test]
    fn test_discount_rejection_rules() {
        let now = 1_000_000;

        let mut code = make_code(DiscountKind::Fixed, 10.0);
        assert!(discount_rejection(&code, 100.0, now).is_none());

        code.is_active = false;
        assert!(discount_rejection(&code, 100.0, now).is_some());
        code.is_active = true;

        code.expires_at = Some(now - 1);
        assert!(discount_rejection(&code, 100.0, now).is_some());
        code.expires_at = None;

        code.min_subtotal = Some(200.0);
        assert!(discount_rejection(&code, 100.0, now).is_some());
        assert!(discount_rejection(&code, 200.0, now).is_none());
    }
}
