// src/models/schedule.rs

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::attendance::Shift;
use super::user::Role;

// Horario semanal de un usuario. Único por (user_id, day_of_week, shift).
// day_of_week es ISO: 1=Lunes .. 6=Sábado (no hay turnos los domingos).
// start_time/end_time son overrides opcionales de la hora global del turno.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day_of_week: i16,
    pub shift: Shift,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// Fila del join horario × usuario activo que consume el job de faltas.
#[derive(Debug, Clone, FromRow)]
pub struct SweepCandidate {
    pub user_id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub start_time: Option<NaiveTime>,
}
