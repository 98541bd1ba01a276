//! Wishlist Model

use serde::{Deserialize, Serialize};

use crate::checkout::ProductRef;
use crate::types::Timestamp;

/// 心愿单条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 所属购物者 (user:xxx)
    pub owner: String,
    pub product_ref: ProductRef,
    pub added_at: Timestamp,
}
