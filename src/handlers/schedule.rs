// src/handlers/schedule.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::db::NewScheduleItem;
use crate::models::Shift;

use super::{require_admin, CurrentUser};

fn default_true() -> bool {
    true
}

// Serialize: `validator` serializa el valor rechazado dentro de los params
// del error de validación.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItemPayload {
    #[validate(range(min = 1, max = 6, message = "day_of_week debe estar entre 1 (lunes) y 6 (sábado)"))]
    pub day_of_week: i16,
    pub shift: Shift,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SchedulePayload {
    #[validate(nested, length(max = 12, message = "Máximo 12 entradas de horario (6 días x 2 turnos)"))]
    pub items: Vec<ScheduleItemPayload>,
}

/// GET /api/users/{user_id}/schedule
/// El propio usuario o un admin pueden consultarlo.
pub async fn get_schedule(
    State(state): State<AppState>,
    CurrentUser(requester_id): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if requester_id != user_id {
        require_admin(&state, requester_id).await?;
    }

    let schedules = state.schedule_service.get_for_user(user_id).await?;
    Ok(Json(json!({ "success": true, "data": schedules })))
}

/// PUT /api/users/{user_id}/schedule
/// Reemplazo completo del horario semanal, en una sola transacción.
pub async fn replace_schedule(
    State(state): State<AppState>,
    CurrentUser(requester_id): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SchedulePayload>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, requester_id).await?;
    payload.validate()?;

    let items: Vec<NewScheduleItem> = payload
        .items
        .into_iter()
        .map(|item| NewScheduleItem {
            day_of_week: item.day_of_week,
            shift: item.shift,
            is_active: item.is_active,
            start_time: item.start_time,
            end_time: item.end_time,
        })
        .collect();

    let schedules = state
        .schedule_service
        .replace_for_user(user_id, items)
        .await?;
    Ok(Json(json!({ "success": true, "data": schedules })))
}
