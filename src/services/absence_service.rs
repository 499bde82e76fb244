// src/services/absence_service.rs
//
// Barrido de faltas: al cierre de cada turno marca FALTA a todo usuario
// activo con horario programado que no registró entrada. Es idempotente:
// volver a correrlo el mismo día no duplica filas ni descuentos.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::common::clock::BusinessClock;
use crate::common::error::AppError;
use crate::config::rules::BusinessRules;
use crate::db::{AttendanceStore, AuditStore, NewAbsence, ScheduleStore};
use crate::models::{AuditAction, NewAuditLog, Role, Shift};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub date: NaiveDate,
    pub shift: Shift,
    pub total_users: u32,
    pub absences_marked: u32,
}

#[derive(Clone)]
pub struct AbsenceService {
    schedules: Arc<dyn ScheduleStore>,
    records: Arc<dyn AttendanceStore>,
    audit: Arc<dyn AuditStore>,
    rules: Arc<BusinessRules>,
    clock: BusinessClock,
}

impl AbsenceService {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        records: Arc<dyn AttendanceStore>,
        audit: Arc<dyn AuditStore>,
        rules: Arc<BusinessRules>,
    ) -> Self {
        let clock = BusinessClock::new(rules.timezone);
        Self {
            schedules,
            records,
            audit,
            rules,
            clock,
        }
    }

    /// Corre el barrido para el turno dado sobre la fecha de negocio de
    /// `now`. Un error de persistencia aborta el lote; lo ya marcado queda.
    pub async fn run(&self, shift: Shift, now: DateTime<Utc>) -> Result<SweepSummary, AppError> {
        let date = self.clock.business_date(now);
        let iso_day = date.weekday().number_from_monday() as i16;

        let candidates = self.schedules.sweep_candidates(iso_day, shift).await?;
        let total_users = candidates.len() as u32;
        let mut absences_marked = 0u32;

        tracing::info!(
            "🔍 Barrido de faltas {date} turno {shift}: {total_users} usuarios programados"
        );

        for candidate in &candidates {
            // Cualquier fila existente (presente, tarde o justificada) exime
            if self
                .records
                .find_by_key(candidate.user_id, date, shift)
                .await?
                .is_some()
            {
                continue;
            }

            let discount_amount = if candidate.role == Role::Admin {
                Decimal::ZERO
            } else {
                self.rules.absence_discount
            };

            let inserted = self
                .records
                .create_absence(&NewAbsence {
                    user_id: candidate.user_id,
                    attendance_date: date,
                    shift,
                    discount_amount,
                })
                .await?;

            // None: otro proceso ganó la carrera y la fila ya existe
            let Some(_record) = inserted else {
                continue;
            };
            absences_marked += 1;

            let entry = NewAuditLog {
                user_id: candidate.user_id,
                qr_id: None,
                action: AuditAction::AutoAbsence,
                reason: format!(
                    "Marcado automáticamente como falta - Sin registro en turno {shift}"
                ),
                latitude: None,
                longitude: None,
                accuracy_m: None,
                ip_address: None,
                user_agent: None,
            };
            if let Err(err) = self.audit.append(entry).await {
                tracing::warn!("No se pudo auditar la falta automática: {}", err);
            }

            tracing::info!("❌ Falta marcada: {} ({shift})", candidate.full_name);
        }

        tracing::info!("✅ Barrido completado: {absences_marked} faltas de {total_users} usuarios");

        Ok(SweepSummary {
            date,
            shift,
            total_users,
            absences_marked,
        })
    }
}
