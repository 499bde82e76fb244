// src/models/attendance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Turno (medio día de trabajo) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shift", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Shift {
    Am, // "AM"
    Pm, // "PM"
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shift::Am => write!(f, "AM"),
            Shift::Pm => write!(f, "PM"),
        }
    }
}

// --- Estado del registro ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Presente,
    Tarde,
    Falta,
    Justificado,
}

// --- Registro de asistencia ---
// A lo sumo uno por (user_id, attendance_date, shift): la máquina de estados
// por turno es NO_RECORD → CHECKED_IN → CHECKED_OUT, y CHECKED_OUT es terminal.
// `qr_id` es NULL cuando el registro lo creó el job de faltas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub qr_id: Option<Uuid>,
    pub attendance_date: NaiveDate,
    pub shift: Shift,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_in_lat: Option<f64>,
    pub check_in_lng: Option<f64>,
    pub check_in_accuracy_m: Option<f64>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_lat: Option<f64>,
    pub check_out_lng: Option<f64>,
    pub check_out_accuracy_m: Option<f64>,
    pub late_minutes: i32,
    pub discount_amount: Decimal,
    pub status: AttendanceStatus,
    pub is_justified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn has_check_in(&self) -> bool {
        self.check_in_time.is_some()
    }

    pub fn has_check_out(&self) -> bool {
        self.check_out_time.is_some()
    }
}
