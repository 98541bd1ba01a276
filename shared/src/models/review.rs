//! Review Model

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// 菜品评价
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 评价者 (user:xxx)
    pub owner: String,
    /// 被评价的菜单项 ID
    pub menu_item: String,
    /// 评分 1-5
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCreate {
    pub menu_item: String,
    pub rating: i32,
    pub comment: Option<String>,
}

/// 菜单项的评分汇总
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}
