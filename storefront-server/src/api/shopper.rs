//! 购物者身份提取器
//!
//! 认证/会话属于外部服务；它在反向代理层校验后把身份注入请求头：
//!
//! - `x-user-id`: 已登录用户的 user id
//! - `x-guest-session`: 匿名购物者的本地会话令牌
//!
//! 两者都缺失的请求无法关联购物车等资源，直接拒绝。

use axum::extract::FromRequestParts;
use http::request::Parts;

use shared::ShopperRef;

use crate::utils::AppError;

/// 当前请求的购物者
#[derive(Debug, Clone)]
pub struct Shopper(pub ShopperRef);

impl Shopper {
    /// 数据库 owner 字段的统一表示
    pub fn owner_key(&self) -> String {
        self.0.storage_key()
    }
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(user_id) = header("x-user-id") {
            return Ok(Shopper(ShopperRef::User(user_id.to_string())));
        }
        if let Some(token) = header("x-guest-session") {
            return Ok(Shopper(ShopperRef::Guest(token.to_string())));
        }

        Err(AppError::invalid(
            "Missing shopper identity (x-user-id or x-guest-session header)",
        ))
    }
}
