//! Common types for the shared crate
//!
//! Utility types used across the storefront

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// 购物者标识 - 注册用户或访客会话
///
/// 认证由外部服务负责；服务端只消费其注入的身份。
/// 访客通过本地生成的会话令牌识别，登录后可将购物车合并到账户。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ShopperRef {
    /// 注册用户 (外部认证服务的 user id)
    User(String),
    /// 访客会话令牌
    Guest(String),
}

impl ShopperRef {
    /// 是否为访客
    pub fn is_guest(&self) -> bool {
        matches!(self, ShopperRef::Guest(_))
    }

    /// 存储键 - 数据库 owner 字段的统一表示
    pub fn storage_key(&self) -> String {
        match self {
            ShopperRef::User(id) => format!("user:{id}"),
            ShopperRef::Guest(token) => format!("guest:{token}"),
        }
    }
}

impl fmt::Display for ShopperRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_roundtrip_distinct() {
        let user = ShopperRef::User("u1".into());
        let guest = ShopperRef::Guest("u1".into());
        assert_ne!(user.storage_key(), guest.storage_key());
        assert!(guest.is_guest());
        assert!(!user.is_guest());
    }
}
