// src/handlers/attendance.rs

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::models::scan::{ScanInput, ScanOutcome};

use super::{require_admin, CurrentUser};

// Los campos son opcionales: el primer paso del motor es MISSING_FIELDS,
// no un 422 de deserialización.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    pub qr_token: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(alias = "accuracy")]
    pub accuracy_m: Option<f64>,
}

/// POST /api/attendance/scan
pub async fn scan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(payload): Json<ScanPayload>,
) -> Result<Response, AppError> {
    let input = ScanInput {
        qr_token: payload.qr_token,
        latitude: payload.latitude,
        longitude: payload.longitude,
        accuracy_m: payload.accuracy_m,
        ip_address: Some(addr.ip().to_string()),
        user_agent: user_agent.map(|TypedHeader(ua)| ua.as_str().to_string()),
    };

    let outcome = state
        .attendance_service
        .process_scan(user_id, &input, Utc::now())
        .await?;

    let response = match outcome {
        ScanOutcome::Success(success) => {
            let body = json!({
                "success": true,
                "message": success.message,
                "data": success,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        ScanOutcome::Rejected(rejection) => {
            let mut body = json!({
                "error": rejection.code,
                "message": rejection.message,
            });
            // Los datos extra (distancia, accuracy...) van al nivel superior
            if let (Some(obj), Some(serde_json::Value::Object(extra))) =
                (body.as_object_mut(), rejection.extra)
            {
                obj.extend(extra);
            }
            (rejection.code.http_status(), Json(body)).into_response()
        }
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl RecordsQuery {
    fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(30).clamp(1, 500)
    }
}

/// GET /api/attendance/my-records
pub async fn my_records(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<RecordsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = state
        .report_service
        .my_records(user_id, query.range(), query.limit())
        .await?;
    Ok(Json(json!({ "success": true, "data": records })))
}

/// GET /api/attendance/admin/all
pub async fn admin_all(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<RecordsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, user_id).await?;

    let records = state
        .report_service
        .all_records(query.range(), query.user_id, query.limit())
        .await?;
    Ok(Json(json!({ "success": true, "data": records })))
}
