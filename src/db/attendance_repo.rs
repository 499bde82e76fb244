// src/db/attendance_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{AttendanceRecord, AttendanceStatus, Role, Shift},
};

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub user_id: Uuid,
    pub qr_id: Uuid,
    pub attendance_date: NaiveDate,
    pub shift: Shift,
    pub check_in_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub late_minutes: i32,
    pub discount_amount: Decimal,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone)]
pub struct CheckOut {
    pub check_out_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
}

#[derive(Debug, Clone)]
pub struct NewAbsence {
    pub user_id: Uuid,
    pub attendance_date: NaiveDate,
    pub shift: Shift,
    pub discount_amount: Decimal,
}

// Fila formateable del reporte administrativo (join con usuario y sede).
#[derive(Debug, Clone, FromRow)]
pub struct AdminRecordRow {
    pub id: Uuid,
    pub full_name: String,
    pub employee_code: String,
    pub role: Role,
    pub attendance_date: NaiveDate,
    pub shift: Shift,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub late_minutes: i32,
    pub discount_amount: Decimal,
    pub status: AttendanceStatus,
    pub location_name: Option<String>,
}

// La abstracción de persistencia de registros de asistencia. El contrato
// clave: `create_check_in` y `create_absence` son atómicos frente al índice
// único (user_id, attendance_date, shift): un choque se reporta como
// `DuplicateAttendance` (check-in) o como inserción vacía (falta), nunca como
// fila duplicada.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_by_key(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    async fn create_check_in(&self, data: &NewCheckIn) -> Result<AttendanceRecord, AppError>;

    /// Completa el check-in sobre una fila ya existente sin hora de entrada
    /// (p. ej. una FALTA previa que se regulariza). Si otro escritor ya fijó
    /// la entrada, devuelve `DuplicateAttendance`.
    async fn apply_check_in(
        &self,
        record_id: Uuid,
        data: &NewCheckIn,
    ) -> Result<AttendanceRecord, AppError>;

    /// Fija la salida; `DuplicateAttendance` si ya estaba registrada.
    async fn apply_check_out(
        &self,
        record_id: Uuid,
        data: &CheckOut,
    ) -> Result<AttendanceRecord, AppError>;

    /// Inserta una FALTA solo si la clave no existe todavía. Devuelve `None`
    /// cuando otro escritor (escaneo en vivo o barrido previo) ya creó la fila.
    async fn create_absence(
        &self,
        data: &NewAbsence,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError>;
}

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Historial completo para el reporte admin, con filtros opcionales.
    pub async fn list_all_with_user(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AdminRecordRow>, AppError> {
        let (start, end) = match range {
            Some((s, e)) => (Some(s), Some(e)),
            None => (None, None),
        };

        let rows = sqlx::query_as::<_, AdminRecordRow>(
            r#"
            SELECT
                a.id, u.full_name, u.employee_code, u.role,
                a.attendance_date, a.shift, a.check_in_time, a.check_out_time,
                a.late_minutes, a.discount_amount, a.status,
                l.name AS location_name
            FROM attendance_records a
            JOIN users u ON u.id = a.user_id
            LEFT JOIN qr_codes q ON q.id = a.qr_id
            LEFT JOIN locations l ON l.id = q.location_id
            WHERE ($1::date IS NULL OR a.attendance_date >= $1)
              AND ($2::date IS NULL OR a.attendance_date <= $2)
              AND ($3::uuid IS NULL OR a.user_id = $3)
            ORDER BY a.attendance_date DESC
            LIMIT $4
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AttendanceStore for AttendanceRepository {
    async fn find_by_key(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let maybe_record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE user_id = $1 AND attendance_date = $2 AND shift = $3
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(shift)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_record)
    }

    async fn create_check_in(&self, data: &NewCheckIn) -> Result<AttendanceRecord, AppError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records (
                user_id, qr_id, attendance_date, shift,
                check_in_time, check_in_lat, check_in_lng, check_in_accuracy_m,
                late_minutes, discount_amount, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.qr_id)
        .bind(data.attendance_date)
        .bind(data.shift)
        .bind(data.check_in_time)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.accuracy_m)
        .bind(data.late_minutes)
        .bind(data.discount_amount)
        .bind(data.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Dos escaneos casi simultáneos: el segundo choca con el índice
            // único y debe responder DUPLICATE_CHECK_IN, no 500.
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateAttendance;
                }
            }
            AppError::DatabaseError(e)
        })
    }

    async fn apply_check_in(
        &self,
        record_id: Uuid,
        data: &NewCheckIn,
    ) -> Result<AttendanceRecord, AppError> {
        // El guard IS NULL cubre dos escaneos concurrentes contra la misma
        // fila: el perdedor no encuentra fila y responde como duplicado
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            UPDATE attendance_records SET
                qr_id = $2, check_in_time = $3, check_in_lat = $4,
                check_in_lng = $5, check_in_accuracy_m = $6,
                late_minutes = $7, discount_amount = $8, status = $9,
                updated_at = NOW()
            WHERE id = $1 AND check_in_time IS NULL
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(data.qr_id)
        .bind(data.check_in_time)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.accuracy_m)
        .bind(data.late_minutes)
        .bind(data.discount_amount)
        .bind(data.status)
        .fetch_optional(&self.pool)
        .await?;
        record.ok_or(AppError::DuplicateAttendance)
    }

    async fn apply_check_out(
        &self,
        record_id: Uuid,
        data: &CheckOut,
    ) -> Result<AttendanceRecord, AppError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            UPDATE attendance_records SET
                check_out_time = $2, check_out_lat = $3,
                check_out_lng = $4, check_out_accuracy_m = $5,
                updated_at = NOW()
            WHERE id = $1 AND check_out_time IS NULL
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(data.check_out_time)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.accuracy_m)
        .fetch_optional(&self.pool)
        .await?;
        record.ok_or(AppError::DuplicateAttendance)
    }

    async fn create_absence(
        &self,
        data: &NewAbsence,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let maybe_record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records (
                user_id, attendance_date, shift,
                late_minutes, discount_amount, status, is_justified
            )
            VALUES ($1, $2, $3, 0, $4, 'FALTA', FALSE)
            ON CONFLICT (user_id, attendance_date, shift) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.attendance_date)
        .bind(data.shift)
        .bind(data.discount_amount)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_record)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let (start, end) = match range {
            Some((s, e)) => (Some(s), Some(e)),
            None => (None, None),
        };

        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE user_id = $1
              AND ($2::date IS NULL OR attendance_date >= $2)
              AND ($3::date IS NULL OR attendance_date <= $3)
            ORDER BY attendance_date DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
