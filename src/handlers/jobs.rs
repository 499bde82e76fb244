// src/handlers/jobs.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::models::Shift;

use super::{require_admin, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct SweepQuery {
    pub shift: Shift,
}

/// POST /api/jobs/mark-absences?shift=AM
/// Disparo manual del barrido de faltas. El scheduler externo (cron del
/// contenedor) llama a esta misma ruta al cierre de cada turno.
pub async fn mark_absences(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<SweepQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, user_id).await?;

    let summary = state.absence_service.run(query.shift, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": summary })))
}
