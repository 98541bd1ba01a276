//! 支付模块 - 支付处理器集成
//!
//! 处理器只承担两件事：
//! 1. 按金额/币种/订单签发支付授权句柄 (PaymentIntent)
//! 2. 客户端确认后回传结果 (客户端回调、重定向返回或 webhook)
//!
//! 充值状态机完全属于处理器；本服务只消费其结果。

pub mod stripe;

pub use stripe::StripeGateway;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// 支付授权句柄 - 代表一笔待客户端确认的扣款
#[derive(Debug, Clone, Serialize)]
pub struct PaymentHandle {
    /// 处理器侧的 intent id
    pub intent_id: String,
    /// 客户端确认所需的不透明凭据
    pub client_secret: String,
    /// 金额 (最小货币单位)
    pub amount_minor: i64,
    pub currency: String,
}

/// 支付网关错误
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment processor request failed: {0}")]
    Request(String),

    #[error("Payment processor rejected the request: {0}")]
    Rejected(String),
}

/// 支付网关 - 处理器的窄接口
///
/// 生产实现为 [`StripeGateway`]；测试可注入桩实现。
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 为订单签发支付授权句柄
    ///
    /// `amount` 为货币单位 (内部换算为最小单位)。
    async fn create_intent(
        &self,
        amount: f64,
        currency: &str,
        order_id: &str,
        email: Option<&str>,
    ) -> Result<PaymentHandle, PaymentError>;
}

/// 货币单位 -> 最小货币单位 (分)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_rounding() {
        assert_eq!(to_minor_units(972.0), 97200);
        assert_eq!(to_minor_units(10.01), 1001);
        // 二进制浮点的 19.99 略小于 19.99，round 仍须给出 1999
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_minor_units(0.0), 0);
    }
}
