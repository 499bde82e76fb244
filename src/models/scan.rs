// src/models/scan.rs
//
// El resultado del motor de decisión de escaneos: una unión discriminada.
// Los rechazos de política (ventana, geofence, duplicados...) son resultados
// esperados y viajan tipados, no como errores; solo las fallas de
// infraestructura suben como `AppError`.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::attendance::{AttendanceStatus, Shift};
use super::qr::ScanDirection;

// --- Entrada del escaneo ---
// Los campos del cliente son opcionales a propósito: el primer paso del
// pipeline es el chequeo MISSING_FIELDS.
#[derive(Debug, Clone, Default)]
pub struct ScanInput {
    pub qr_token: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// --- Códigos de rechazo ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanErrorCode {
    MissingFields,
    InvalidQrToken,
    UserInactive,
    ScheduleMismatch,
    OutOfWindow,
    QrExpired,
    GpsAccuracyTooLow,
    LocationOutOfRange,
    CheckInRequired,
    DuplicateCheckIn,
    DuplicateCheckOut,
    ServerError,
}

impl ScanErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorCode::MissingFields => "MISSING_FIELDS",
            ScanErrorCode::InvalidQrToken => "INVALID_QR_TOKEN",
            ScanErrorCode::UserInactive => "USER_INACTIVE",
            ScanErrorCode::ScheduleMismatch => "SCHEDULE_MISMATCH",
            ScanErrorCode::OutOfWindow => "OUT_OF_WINDOW",
            ScanErrorCode::QrExpired => "QR_EXPIRED",
            ScanErrorCode::GpsAccuracyTooLow => "GPS_ACCURACY_TOO_LOW",
            ScanErrorCode::LocationOutOfRange => "LOCATION_OUT_OF_RANGE",
            ScanErrorCode::CheckInRequired => "CHECK_IN_REQUIRED",
            ScanErrorCode::DuplicateCheckIn => "DUPLICATE_CHECK_IN",
            ScanErrorCode::DuplicateCheckOut => "DUPLICATE_CHECK_OUT",
            ScanErrorCode::ServerError => "SERVER_ERROR",
        }
    }

    /// Sugerencia de status HTTP para la capa de transporte.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ScanErrorCode::MissingFields
            | ScanErrorCode::InvalidQrToken
            | ScanErrorCode::CheckInRequired => StatusCode::BAD_REQUEST,
            ScanErrorCode::UserInactive
            | ScanErrorCode::ScheduleMismatch
            | ScanErrorCode::LocationOutOfRange => StatusCode::FORBIDDEN,
            ScanErrorCode::OutOfWindow | ScanErrorCode::QrExpired => StatusCode::GONE,
            ScanErrorCode::GpsAccuracyTooLow => StatusCode::UNPROCESSABLE_ENTITY,
            ScanErrorCode::DuplicateCheckIn | ScanErrorCode::DuplicateCheckOut => {
                StatusCode::CONFLICT
            }
            ScanErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// --- Rechazo tipado ---
#[derive(Debug, Clone, Serialize)]
pub struct ScanRejection {
    pub code: ScanErrorCode,
    pub message: String,
    // Datos adicionales para que el usuario se corrija (accuracy medida,
    // distancia calculada, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl ScanRejection {
    pub fn new(code: ScanErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

// --- Éxito ---
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSuccess {
    pub record_id: Uuid,
    #[serde(rename = "type")]
    pub direction: ScanDirection,
    pub shift: Shift,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
    pub status: AttendanceStatus,
    #[serde(skip)]
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Success(ScanSuccess),
    Rejected(ScanRejection),
}

impl ScanOutcome {
    #[cfg(test)]
    pub fn rejection_code(&self) -> Option<ScanErrorCode> {
        match self {
            ScanOutcome::Rejected(r) => Some(r.code),
            ScanOutcome::Success(_) => None,
        }
    }
}
