// src/services/report_service.rs
//
// Reportes de asistencia: el historial propio del usuario y el consolidado
// administrativo. Las horas se presentan en la zona de negocio.

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{attendance_repo::AdminRecordRow, AttendanceRepository, AttendanceStore};
use crate::models::{AttendanceRecord, AttendanceStatus, Role, Shift};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecordReport {
    pub id: Uuid,
    pub employee: String,
    pub code: String,
    pub role: Role,
    pub date: String,
    pub shift: Shift,
    pub check_in: String,
    pub check_out: String,
    pub late_minutes: i32,
    pub discount: Decimal,
    pub status: AttendanceStatus,
    pub location: String,
}

fn format_row(row: &AdminRecordRow, tz: Tz) -> AdminRecordReport {
    let fmt_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.with_timezone(&tz).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    AdminRecordReport {
        id: row.id,
        employee: row.full_name.clone(),
        code: row.employee_code.clone(),
        role: row.role,
        date: row.attendance_date.format("%Y-%m-%d").to_string(),
        shift: row.shift,
        check_in: fmt_time(row.check_in_time),
        check_out: fmt_time(row.check_out_time),
        late_minutes: row.late_minutes,
        discount: row.discount_amount,
        status: row.status,
        // Las faltas automáticas no tienen QR ni sede asociada
        location: row
            .location_name
            .clone()
            .unwrap_or_else(|| "DESCONOCIDO".to_string()),
    }
}

#[derive(Clone)]
pub struct ReportService {
    repo: AttendanceRepository,
    tz: Tz,
}

impl ReportService {
    pub fn new(repo: AttendanceRepository, tz: Tz) -> Self {
        Self { repo, tz }
    }

    pub async fn my_records(
        &self,
        user_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        self.repo.list_for_user(user_id, range, limit).await
    }

    pub async fn all_records(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AdminRecordReport>, AppError> {
        let rows = self.repo.list_all_with_user(range, user_id, limit).await?;
        Ok(rows.iter().map(|row| format_row(row, self.tz)).collect())
    }
}
