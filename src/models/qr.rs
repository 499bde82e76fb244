// src/models/qr.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::attendance::Shift;

// --- Sentido del escaneo ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scan_direction", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanDirection {
    In,  // "IN"
    Out, // "OUT"
}

// --- Código QR ---
// Dos ciclos de vida:
//  - Dinámico (is_fixed = false): uno por día calendario y (turno × sentido),
//    con validez explícita [valid_from, valid_until] y qr_type fijado al crear.
//  - Fijo (is_fixed = true): uno por turno, validez de años; qr_type es solo
//    un valor de relleno y el sentido real se infiere al escanear según el
//    estado del registro del día.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    pub id: Uuid,
    pub qr_token: String,
    pub qr_type: ScanDirection,
    pub shift: Shift,
    pub location_id: Uuid,
    pub is_fixed: bool,
    pub qr_date: Option<NaiveDate>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// --- Sede (centro del geofence) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
