// src/db/memory.rs
//
// Implementaciones en memoria de los stores, solo para tests del motor de
// escaneo y del job de faltas. Reproducen el contrato del índice único
// (user_id, attendance_date, shift).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{
    schedule::SweepCandidate, AttendanceRecord, Location, NewAuditLog, QrCode, Shift, User,
    UserSchedule,
};

use super::{AttendanceStore, AuditStore, CheckOut, NewAbsence, NewCheckIn, QrStore, ScheduleStore, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub schedules: Mutex<Vec<UserSchedule>>,
    pub qrs: Mutex<Vec<QrCode>>,
    pub locations: Mutex<HashMap<Uuid, Location>>,
    pub records: Mutex<Vec<AttendanceRecord>>,
    pub audits: Mutex<Vec<NewAuditLog>>,
}

impl MemoryStore {
    pub async fn add_user(&self, user: User) {
        self.users.lock().await.insert(user.id, user);
    }

    pub async fn add_schedule(&self, schedule: UserSchedule) {
        self.schedules.lock().await.push(schedule);
    }

    pub async fn add_qr(&self, qr: QrCode) {
        self.qrs.lock().await.push(qr);
    }

    pub async fn add_location(&self, location: Location) {
        self.locations.lock().await.insert(location.id, location);
    }

    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn audit_count(&self) -> usize {
        self.audits.lock().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn find_for(
        &self,
        user_id: Uuid,
        day_of_week: i16,
        shift: Shift,
    ) -> Result<Option<UserSchedule>, AppError> {
        Ok(self
            .schedules
            .lock()
            .await
            .iter()
            .find(|s| s.user_id == user_id && s.day_of_week == day_of_week && s.shift == shift)
            .cloned())
    }

    async fn sweep_candidates(
        &self,
        day_of_week: i16,
        shift: Shift,
    ) -> Result<Vec<SweepCandidate>, AppError> {
        let users = self.users.lock().await;
        let candidates = self
            .schedules
            .lock()
            .await
            .iter()
            .filter(|s| s.day_of_week == day_of_week && s.shift == shift && s.is_active)
            .filter_map(|s| {
                let user = users.get(&s.user_id)?;
                if !user.is_active {
                    return None;
                }
                Some(SweepCandidate {
                    user_id: user.id,
                    full_name: user.full_name.clone(),
                    role: user.role,
                    start_time: s.start_time,
                })
            })
            .collect();
        Ok(candidates)
    }
}

#[async_trait]
impl QrStore for MemoryStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<QrCode>, AppError> {
        Ok(self
            .qrs
            .lock()
            .await
            .iter()
            .find(|q| q.qr_token == token)
            .cloned())
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<Location>, AppError> {
        Ok(self.locations.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_by_key(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.user_id == user_id && r.attendance_date == date && r.shift == shift)
            .cloned())
    }

    async fn create_check_in(&self, data: &NewCheckIn) -> Result<AttendanceRecord, AppError> {
        let mut records = self.records.lock().await;
        let clash = records.iter().any(|r| {
            r.user_id == data.user_id
                && r.attendance_date == data.attendance_date
                && r.shift == data.shift
        });
        if clash {
            return Err(AppError::DuplicateAttendance);
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            qr_id: Some(data.qr_id),
            attendance_date: data.attendance_date,
            shift: data.shift,
            check_in_time: Some(data.check_in_time),
            check_in_lat: Some(data.latitude),
            check_in_lng: Some(data.longitude),
            check_in_accuracy_m: Some(data.accuracy_m),
            check_out_time: None,
            check_out_lat: None,
            check_out_lng: None,
            check_out_accuracy_m: None,
            late_minutes: data.late_minutes,
            discount_amount: data.discount_amount,
            status: data.status,
            is_justified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn apply_check_in(
        &self,
        record_id: Uuid,
        data: &NewCheckIn,
    ) -> Result<AttendanceRecord, AppError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("registro inexistente")))?;
        if record.check_in_time.is_some() {
            return Err(AppError::DuplicateAttendance);
        }

        record.qr_id = Some(data.qr_id);
        record.check_in_time = Some(data.check_in_time);
        record.check_in_lat = Some(data.latitude);
        record.check_in_lng = Some(data.longitude);
        record.check_in_accuracy_m = Some(data.accuracy_m);
        record.late_minutes = data.late_minutes;
        record.discount_amount = data.discount_amount;
        record.status = data.status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn apply_check_out(
        &self,
        record_id: Uuid,
        data: &CheckOut,
    ) -> Result<AttendanceRecord, AppError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("registro inexistente")))?;
        if record.check_out_time.is_some() {
            return Err(AppError::DuplicateAttendance);
        }

        record.check_out_time = Some(data.check_out_time);
        record.check_out_lat = Some(data.latitude);
        record.check_out_lng = Some(data.longitude);
        record.check_out_accuracy_m = Some(data.accuracy_m);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn create_absence(
        &self,
        data: &NewAbsence,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let mut records = self.records.lock().await;
        let clash = records.iter().any(|r| {
            r.user_id == data.user_id
                && r.attendance_date == data.attendance_date
                && r.shift == data.shift
        });
        if clash {
            return Ok(None);
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            qr_id: None,
            attendance_date: data.attendance_date,
            shift: data.shift,
            check_in_time: None,
            check_in_lat: None,
            check_in_lng: None,
            check_in_accuracy_m: None,
            check_out_time: None,
            check_out_lat: None,
            check_out_lng: None,
            check_out_accuracy_m: None,
            late_minutes: 0,
            discount_amount: data.discount_amount,
            status: crate::models::AttendanceStatus::Falta,
            is_justified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(Some(record))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| {
                range.is_none_or(|(start, end)| {
                    r.attendance_date >= start && r.attendance_date <= end
                })
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.attendance_date.cmp(&a.attendance_date));
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: NewAuditLog) -> Result<(), AppError> {
        self.audits.lock().await.push(entry);
        Ok(())
    }
}
