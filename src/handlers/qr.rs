// src/handlers/qr.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::models::Shift;

use super::{require_admin, CurrentUser};

/// POST /api/qr/generate-today
/// Idempotente: si los QRs del día ya existen, los devuelve sin crear nuevos.
pub async fn generate_today(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, user_id).await?;

    let qrs = state.qr_service.generate_today(Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": qrs })))
}

/// GET /api/qr/today
pub async fn today(
    State(state): State<AppState>,
    CurrentUser(_user_id): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let qrs = state.qr_service.get_today(Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": qrs })))
}

/// GET /api/qr/fixed/{shift}
/// Devuelve el QR permanente del turno, aprovisionándolo si no existe.
pub async fn fixed(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(shift): Path<Shift>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, user_id).await?;

    let qr = state.qr_service.ensure_fixed(shift, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": qr })))
}
