//! Reservation Model

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// 预订状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

/// 到店预订
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 所属购物者 (user:xxx 或 guest:xxx)
    pub owner: String,
    pub name: String,
    pub phone: String,
    /// 日期 (ISO 8601, YYYY-MM-DD)
    pub date: String,
    /// 时间 (HH:MM)
    pub time: String,
    pub party_size: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ReservationStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreate {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub party_size: i32,
    pub notes: Option<String>,
}
