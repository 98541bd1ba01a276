//! Payment Confirmation Handler
//!
//! [`PaymentPhase`] 状态机的转移规则与重定向返回解析。
//!
//! 两条成功路径 (处理器客户端回调、浏览器重定向返回) 必须收敛到
//! 完全相同的行为：清空购物车、标记成功、触发 best-effort 通知。
//! 这些副作用由 session 层执行；本模块只裁决转移是否合法。

use std::collections::HashMap;

use shared::checkout::PaymentPhase;

use super::CheckoutError;

/// 裁决一次阶段转移
///
/// 合法转移：
/// - Idle -> AwaitingPayment (支付表单展示)
/// - AwaitingPayment -> Succeeded | Failed
/// - Failed -> AwaitingPayment (重试)
/// - Succeeded -> Succeeded (回调与重定向返回双路径幂等收敛)
pub fn transition(from: PaymentPhase, to: PaymentPhase) -> Result<PaymentPhase, CheckoutError> {
    use PaymentPhase::*;

    let allowed = matches!(
        (from, to),
        (Idle, AwaitingPayment)
            | (AwaitingPayment, Succeeded)
            | (AwaitingPayment, Failed)
            | (Failed, AwaitingPayment)
            | (Succeeded, Succeeded)
    );

    if allowed {
        Ok(to)
    } else {
        Err(CheckoutError::Phase(format!("{from:?} -> {to:?}")))
    }
}

/// 重定向返回的成功标记
///
/// 处理器把结果放在返回 URL 的查询串里：
/// `?payment_intent=pi_xxx&redirect_status=succeeded`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOutcome {
    pub payment_intent: String,
    pub succeeded: bool,
}

/// 解析重定向返回查询参数
///
/// 缺少 intent 标记时返回 None (不是一次支付返回)。
pub fn parse_redirect_return(query: &HashMap<String, String>) -> Option<RedirectOutcome> {
    let payment_intent = query.get("payment_intent")?.clone();
    let succeeded = query
        .get("redirect_status")
        .is_some_and(|s| s == "succeeded");
    Some(RedirectOutcome {
        payment_intent,
        succeeded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentPhase::*;

    #[test]
    fn test_happy_path_transitions() {
        assert_eq!(transition(Idle, AwaitingPayment).unwrap(), AwaitingPayment);
        assert_eq!(transition(AwaitingPayment, Succeeded).unwrap(), Succeeded);
    }

    #[test]
    fn test_failure_then_retry() {
        assert_eq!(transition(AwaitingPayment, Failed).unwrap(), Failed);
        assert_eq!(transition(Failed, AwaitingPayment).unwrap(), AwaitingPayment);
    }

    #[test]
    fn test_double_success_converges() {
        // 回调与重定向返回都到达时，第二次成功是幂等的
        assert_eq!(transition(Succeeded, Succeeded).unwrap(), Succeeded);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(transition(Idle, Succeeded).is_err());
        assert!(transition(Idle, Failed).is_err());
        assert!(transition(Succeeded, Failed).is_err());
        assert!(transition(Succeeded, AwaitingPayment).is_err());
        assert!(transition(Failed, Succeeded).is_err());
    }

    #[test]
    fn test_parse_redirect_markers() {
        let mut query = HashMap::new();
        query.insert("payment_intent".to_string(), "pi_123".to_string());
        query.insert("redirect_status".to_string(), "succeeded".to_string());

        let outcome = parse_redirect_return(&query).unwrap();
        assert_eq!(outcome.payment_intent, "pi_123");
        assert!(outcome.succeeded);
    }

    #[test]
    fn test_parse_redirect_failure_status() {
        let mut query = HashMap::new();
        query.insert("payment_intent".to_string(), "pi_123".to_string());
        query.insert("redirect_status".to_string(), "failed".to_string());

        let outcome = parse_redirect_return(&query).unwrap();
        assert!(!outcome.succeeded);
    }

    #[test]
    fn test_parse_non_payment_return() {
        let query = HashMap::new();
        assert_eq!(parse_redirect_return(&query), None);
    }
}
