//! 结账模块 - 购物车到已支付订单的完整流程
//!
//! # 模块结构
//!
//! - [`resolver`] - 商品解析回退链 (权威记录 -> 快照 -> 占位)
//! - [`totals`] - 纯函数总价计算 (小计/配送费/税/折扣)
//! - [`address`] - 地址选择与字段级校验
//! - [`placement`] - 原子下单 + 支付句柄请求
//! - [`payment`] - 支付阶段状态机与重定向返回解析
//! - [`session`] - 结账会话注册表 (持有状态机与监听器)
//! - [`listeners`] - 实时变更监听 (防抖刷新，支付期间压制)
//!
//! # 控制流
//!
//! ```text
//! CartRepository ──▶ resolver ──▶ totals ──▶ (address) ──▶ placement
//!        ▲                                                    │
//!        │                                                    ▼
//!   清空购物车 ◀── payment (Succeeded) ◀── 处理器回调/重定向返回
//! ```

pub mod address;
pub mod listeners;
pub mod payment;
pub mod placement;
pub mod resolver;
pub mod session;
pub mod totals;

pub use resolver::Catalog;
pub use session::{CheckoutSession, CheckoutSessions};

use thiserror::Error;

use shared::checkout::{OrderTotals, ResolvedProduct};
use shared::models::CartLine;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::db::repository::{
    CartRepository, DiscountRepository, OrderRepository, RepoError, SettingsRepository,
};
use crate::utils::AppError;

/// 结账领域错误
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    /// 地址校验失败，携带缺失字段列表
    #[error("Address validation failed")]
    AddressInvalid(Vec<String>),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// 折扣码不可用
    #[error("Discount code rejected: {0}")]
    DiscountRejected(String),

    /// 原子下单被拒绝 (价格/库存复验失败)，消息原样转述
    #[error("{0}")]
    PlacementRejected(String),

    /// 订单已创建但支付句柄请求失败；可凭 order_id 重试支付
    #[error("Payment handle request failed for order {order_id}: {message}")]
    PaymentHandleFailed { order_id: String, message: String },

    /// 非法的支付阶段转移
    #[error("Invalid payment phase transition: {0}")]
    Phase(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => AppError::validation("Cart is empty"),
            CheckoutError::AddressInvalid(fields) => AppError::ValidationFields(fields),
            CheckoutError::Validation(msg) => AppError::validation(msg),
            CheckoutError::DiscountRejected(msg) => AppError::business_rule(msg),
            CheckoutError::PlacementRejected(msg) => AppError::OrderRejected(msg),
            CheckoutError::PaymentHandleFailed { order_id, message } => {
                AppError::PaymentHandle { order_id, message }
            }
            CheckoutError::Phase(msg) => AppError::conflict(msg),
            CheckoutError::NotFound(msg) => AppError::not_found(msg),
            CheckoutError::Repo(RepoError::NotFound(msg)) => AppError::not_found(msg),
            CheckoutError::Repo(e) => AppError::database(e.to_string()),
        }
    }
}

/// 结账报价 - 当前购物车的解析结果与总价
#[derive(Debug, Clone, serde::Serialize)]
pub struct Quote {
    pub lines: Vec<CartLine>,
    pub resolved: Vec<ResolvedProduct>,
    pub totals: OrderTotals,
}

/// 结账流程的数据访问集合
///
/// 各仓库都是 db 句柄的浅拷贝，随处克隆成本极低。
#[derive(Clone)]
pub struct CheckoutDeps {
    pub catalog: Catalog,
    pub carts: CartRepository,
    pub orders: OrderRepository,
    pub discounts: DiscountRepository,
    pub settings: SettingsRepository,
}

impl CheckoutDeps {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            catalog: Catalog::new(db.clone()),
            carts: CartRepository::new(db.clone()),
            orders: OrderRepository::new(db.clone()),
            discounts: DiscountRepository::new(db.clone()),
            settings: SettingsRepository::new(db),
        }
    }
}
