//! Reservation Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use shared::models::{Reservation, ReservationCreate};

use crate::api::Shopper;
use crate::core::ServerState;
use crate::db::repository::ReservationRepository;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_required_text,
};
use crate::utils::{AppError, AppResult};

/// 同时段最大可订人数，超过走电话人工确认
const MAX_PARTY_SIZE: i32 = 20;

/// GET /api/reservations - 当前购物者的预订
pub async fn list(
    State(state): State<ServerState>,
    shopper: Shopper,
) -> AppResult<Json<Vec<Reservation>>> {
    let repo = ReservationRepository::new(state.db.clone());
    let reservations = repo
        .find_by_owner(&shopper.owner_key())
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(reservations))
}

/// POST /api/reservations - 创建预订
pub async fn create(
    State(state): State<ServerState>,
    shopper: Shopper,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<Json<Reservation>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.notes, "notes", MAX_NOTE_LEN)?;

    // 日期 YYYY-MM-DD，时间 HH:MM
    if chrono::NaiveDate::parse_from_str(&payload.date, "%Y-%m-%d").is_err() {
        return Err(AppError::validation("date must be YYYY-MM-DD"));
    }
    if chrono::NaiveTime::parse_from_str(&payload.time, "%H:%M").is_err() {
        return Err(AppError::validation("time must be HH:MM"));
    }
    if !(1..=MAX_PARTY_SIZE).contains(&payload.party_size) {
        return Err(AppError::validation(format!(
            "party_size must be between 1 and {MAX_PARTY_SIZE}"
        )));
    }

    let repo = ReservationRepository::new(state.db.clone());
    let reservation = repo
        .create(&shopper.owner_key(), payload)
        .await
        .map_err(AppError::from_repo)?;

    Ok(Json(reservation))
}

/// POST /api/reservations/{id}/cancel - 取消预订
pub async fn cancel(
    State(state): State<ServerState>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> AppResult<Json<Reservation>> {
    let repo = ReservationRepository::new(state.db.clone());
    let reservation = repo
        .cancel(&shopper.owner_key(), &id)
        .await
        .map_err(AppError::from_repo)?;
    Ok(Json(reservation))
}
