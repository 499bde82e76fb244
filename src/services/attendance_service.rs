// src/services/attendance_service.rs
//
// El motor de decisión de escaneos. Dado un intento (token QR, GPS, accuracy,
// instante), recorre el pipeline de validación y muta el registro de
// asistencia del (usuario, fecha, turno). Cada salida, sea éxito o rechazo,
// escribe exactamente una entrada de auditoría.
//
// Máquina de estados por (usuario, fecha, turno):
//   NO_RECORD → CHECKED_IN → CHECKED_OUT (terminal)

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::common::clock::BusinessClock;
use crate::common::error::AppError;
use crate::common::geo;
use crate::config::rules::BusinessRules;
use crate::db::{AttendanceStore, AuditStore, CheckOut, NewCheckIn, QrStore, ScheduleStore, UserStore};
use crate::models::{
    scan::{ScanErrorCode, ScanInput, ScanOutcome, ScanRejection, ScanSuccess},
    AuditAction, NewAuditLog, QrCode, ScanDirection, User,
};

use super::lateness::calc_late_and_discount;
use super::scan_window::{ScanWindowPolicy, WindowDecision};

#[derive(Clone)]
pub struct AttendanceService {
    users: Arc<dyn UserStore>,
    schedules: Arc<dyn ScheduleStore>,
    qrs: Arc<dyn QrStore>,
    records: Arc<dyn AttendanceStore>,
    audit: Arc<dyn AuditStore>,
    policy: ScanWindowPolicy,
    rules: Arc<BusinessRules>,
    clock: BusinessClock,
}

impl AttendanceService {
    pub fn new(
        users: Arc<dyn UserStore>,
        schedules: Arc<dyn ScheduleStore>,
        qrs: Arc<dyn QrStore>,
        records: Arc<dyn AttendanceStore>,
        audit: Arc<dyn AuditStore>,
        rules: Arc<BusinessRules>,
    ) -> Self {
        let policy = ScanWindowPolicy::new(rules.clone());
        let clock = BusinessClock::new(rules.timezone);
        Self {
            users,
            schedules,
            qrs,
            records,
            audit,
            policy,
            rules,
            clock,
        }
    }

    /// Punto de entrada del escaneo. Los rechazos de política vuelven tipados
    /// en `ScanOutcome::Rejected`; solo los errores de infraestructura suben
    /// como `Err`, auditados como SERVER_ERROR antes de propagarse.
    pub async fn process_scan(
        &self,
        user_id: Uuid,
        input: &ScanInput,
        server_time: DateTime<Utc>,
    ) -> Result<ScanOutcome, AppError> {
        match self.run_pipeline(user_id, input, server_time).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.audit_scan(
                    user_id,
                    None,
                    AuditAction::ScanFail,
                    ScanErrorCode::ServerError.as_str(),
                    input,
                )
                .await;
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        user_id: Uuid,
        input: &ScanInput,
        server_time: DateTime<Utc>,
    ) -> Result<ScanOutcome, AppError> {
        // 1. Campos requeridos
        let (Some(qr_token), Some(latitude), Some(longitude), Some(accuracy_m)) = (
            input.qr_token.as_deref(),
            input.latitude,
            input.longitude,
            input.accuracy_m,
        ) else {
            return Ok(self
                .reject(
                    user_id,
                    None,
                    input,
                    ScanRejection::new(
                        ScanErrorCode::MissingFields,
                        "QR token, latitud, longitud y accuracy son requeridos",
                    ),
                )
                .await);
        };

        // 2. El token debe resolver a un QR conocido con su sede
        let Some(qr) = self.qrs.find_by_token(qr_token).await? else {
            return Ok(self
                .reject(
                    user_id,
                    None,
                    input,
                    ScanRejection::new(ScanErrorCode::InvalidQrToken, "Código QR inválido"),
                )
                .await);
        };
        let Some(location) = self.qrs.find_location(qr.location_id).await? else {
            return Ok(self
                .reject(
                    user_id,
                    Some(qr.id),
                    input,
                    ScanRejection::new(ScanErrorCode::InvalidQrToken, "Código QR inválido"),
                )
                .await);
        };

        // 3. Usuario existente y activo
        let user = match self.users.find_by_id(user_id).await? {
            Some(u) if u.is_active => u,
            _ => {
                return Ok(self
                    .reject(
                        user_id,
                        Some(qr.id),
                        input,
                        ScanRejection::new(ScanErrorCode::UserInactive, "Usuario inactivo"),
                    )
                    .await);
            }
        };

        // 4. Ventana/horario según el modo del QR. También resuelve el
        //    sentido (IN/OUT) y la fecha de asistencia.
        let context = match self
            .resolve_window(&user, &qr, server_time, input)
            .await?
        {
            Ok(ctx) => ctx,
            Err(outcome) => return Ok(outcome),
        };

        // 5. Accuracy GPS
        if accuracy_m > self.rules.gps_accuracy_threshold_m {
            let rejection = ScanRejection::new(
                ScanErrorCode::GpsAccuracyTooLow,
                format!("Señal GPS insuficiente ({accuracy_m}m)."),
            )
            .with_extra(json!({
                "accuracy": accuracy_m,
                "threshold": self.rules.gps_accuracy_threshold_m,
            }));
            return Ok(self.reject(user_id, Some(qr.id), input, rejection).await);
        }

        // 6. Geofence
        let distance =
            geo::distance_meters(latitude, longitude, location.latitude, location.longitude);
        if distance > location.radius_meters {
            let rejection = ScanRejection::new(
                ScanErrorCode::LocationOutOfRange,
                "Está fuera del área permitida",
            )
            .with_extra(json!({
                "distance_meters": distance.round(),
                "max_allowed": location.radius_meters,
            }));
            return Ok(self.reject(user_id, Some(qr.id), input, rejection).await);
        }

        // 7–8. Transición de la máquina de estados
        match context.direction {
            ScanDirection::In => {
                self.handle_check_in(
                    &user, &qr, context, input, server_time, latitude, longitude, accuracy_m,
                )
                .await
            }
            ScanDirection::Out => {
                self.handle_check_out(&user, &qr, context, input, server_time, latitude, longitude, accuracy_m)
                    .await
            }
        }
    }

    /// Paso 4 del pipeline. `Ok(Err(outcome))` es un rechazo ya auditado.
    async fn resolve_window(
        &self,
        user: &User,
        qr: &QrCode,
        server_time: DateTime<Utc>,
        input: &ScanInput,
    ) -> Result<Result<ScanContext, ScanOutcome>, AppError> {
        let local_now = self.clock.to_local(server_time);

        if qr.is_fixed {
            // Modo fijo: la fecha objetivo es HOY en la zona de negocio
            let target_date = local_now.date_naive();
            let iso_day = target_date.weekday().number_from_monday() as i16;

            let schedule = self.schedules.find_for(user.id, iso_day, qr.shift).await?;
            let schedule = match schedule {
                Some(s) if s.is_active => s,
                _ => {
                    let outcome = self
                        .reject(
                            user.id,
                            Some(qr.id),
                            input,
                            ScanRejection::new(
                                ScanErrorCode::ScheduleMismatch,
                                "No tiene turno programado para hoy en este horario.",
                            ),
                        )
                        .await;
                    return Ok(Err(outcome));
                }
            };

            // Sentido inferido: OUT solo si ya hay una entrada registrada
            let existing = self
                .records
                .find_by_key(user.id, target_date, qr.shift)
                .await?;
            let direction = if existing.as_ref().is_some_and(|r| r.has_check_in()) {
                ScanDirection::Out
            } else {
                ScanDirection::In
            };

            match self.policy.check_fixed(direction, qr.shift, local_now) {
                WindowDecision::Allowed => {}
                WindowDecision::TooEarly { opens } => {
                    let outcome = self
                        .reject(
                            user.id,
                            Some(qr.id),
                            input,
                            ScanRejection::new(
                                ScanErrorCode::OutOfWindow,
                                format!("Aún no es hora de marcar. Inicio: {}", opens.format("%H:%M")),
                            ),
                        )
                        .await;
                    return Ok(Err(outcome));
                }
                WindowDecision::TooLate { closed } => {
                    let outcome = self
                        .reject(
                            user.id,
                            Some(qr.id),
                            input,
                            ScanRejection::new(
                                ScanErrorCode::OutOfWindow,
                                format!(
                                    "El horario de marcación ha terminado. Fin: {}",
                                    closed.format("%H:%M")
                                ),
                            ),
                        )
                        .await;
                    return Ok(Err(outcome));
                }
            }

            Ok(Ok(ScanContext {
                direction,
                attendance_date: target_date,
                existing,
                scheduled_start: schedule.start_time,
            }))
        } else {
            // Modo dinámico: el QR trae su sentido y su validez
            if !self.policy.check_dynamic(qr, server_time) {
                let outcome = self
                    .reject(
                        user.id,
                        Some(qr.id),
                        input,
                        ScanRejection::new(
                            ScanErrorCode::QrExpired,
                            "Código QR expirado o inválido",
                        ),
                    )
                    .await;
                return Ok(Err(outcome));
            }

            let attendance_date = qr.qr_date.unwrap_or_else(|| local_now.date_naive());
            let existing = self
                .records
                .find_by_key(user.id, attendance_date, qr.shift)
                .await?;

            Ok(Ok(ScanContext {
                direction: qr.qr_type,
                attendance_date,
                existing,
                scheduled_start: None,
            }))
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_check_in(
        &self,
        user: &User,
        qr: &QrCode,
        context: ScanContext,
        input: &ScanInput,
        server_time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        accuracy_m: f64,
    ) -> Result<ScanOutcome, AppError> {
        // Entrada duplicada: se rechaza sin tocar el registro existente
        if context.existing.as_ref().is_some_and(|r| r.has_check_in()) {
            let rejection = ScanRejection::new(
                ScanErrorCode::DuplicateCheckIn,
                "Ya registró entrada en este turno",
            );
            return Ok(self.reject(user.id, Some(qr.id), input, rejection).await);
        }

        let lateness = calc_late_and_discount(
            &self.rules,
            qr.shift,
            self.clock.to_local(server_time),
            context.scheduled_start,
        );

        let new_check_in = NewCheckIn {
            user_id: user.id,
            qr_id: qr.id,
            attendance_date: context.attendance_date,
            shift: qr.shift,
            check_in_time: server_time,
            latitude,
            longitude,
            accuracy_m,
            late_minutes: lateness.late_minutes,
            discount_amount: lateness.discount_amount,
            status: lateness.status,
        };

        let attempt = match &context.existing {
            // Fila previa sin entrada (p. ej. FALTA del barrido): se completa
            Some(existing) => self.records.apply_check_in(existing.id, &new_check_in).await,
            None => self.records.create_check_in(&new_check_in).await,
        };
        let record = match attempt {
            Ok(record) => record,
            // Perdimos la carrera contra otro escaneo: el store manda
            // (índice único o guard del UPDATE) y respondemos como duplicado.
            Err(AppError::DuplicateAttendance) => {
                let rejection = ScanRejection::new(
                    ScanErrorCode::DuplicateCheckIn,
                    "Ya registró entrada en este turno",
                );
                return Ok(self.reject(user.id, Some(qr.id), input, rejection).await);
            }
            Err(err) => return Err(err),
        };

        self.audit_scan(user.id, Some(qr.id), AuditAction::ScanSuccess, "CHECK_IN", input)
            .await;

        let message = if lateness.late_minutes > 0 {
            format!("Entrada registrada ({} min tarde)", lateness.late_minutes)
        } else {
            "Entrada registrada exitosamente".to_string()
        };

        Ok(ScanOutcome::Success(ScanSuccess {
            record_id: record.id,
            direction: ScanDirection::In,
            shift: qr.shift,
            timestamp: server_time,
            late_minutes: Some(lateness.late_minutes),
            discount_amount: Some(lateness.discount_amount),
            status: record.status,
            message,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_check_out(
        &self,
        user: &User,
        qr: &QrCode,
        context: ScanContext,
        input: &ScanInput,
        server_time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        accuracy_m: f64,
    ) -> Result<ScanOutcome, AppError> {
        let Some(existing) = context.existing.as_ref().filter(|r| r.has_check_in()) else {
            let rejection = ScanRejection::new(
                ScanErrorCode::CheckInRequired,
                "Debe registrar entrada antes de la salida",
            );
            return Ok(self.reject(user.id, Some(qr.id), input, rejection).await);
        };

        if existing.has_check_out() {
            let rejection = ScanRejection::new(
                ScanErrorCode::DuplicateCheckOut,
                "Ya registró salida en este turno",
            );
            return Ok(self.reject(user.id, Some(qr.id), input, rejection).await);
        }

        // Solo campos de salida: la tardanza del check-in no se recalcula
        let attempt = self
            .records
            .apply_check_out(
                existing.id,
                &CheckOut {
                    check_out_time: server_time,
                    latitude,
                    longitude,
                    accuracy_m,
                },
            )
            .await;
        let record = match attempt {
            Ok(record) => record,
            // Otra salida concurrente ganó el UPDATE guardado
            Err(AppError::DuplicateAttendance) => {
                let rejection = ScanRejection::new(
                    ScanErrorCode::DuplicateCheckOut,
                    "Ya registró salida en este turno",
                );
                return Ok(self.reject(user.id, Some(qr.id), input, rejection).await);
            }
            Err(err) => return Err(err),
        };

        self.audit_scan(user.id, Some(qr.id), AuditAction::ScanSuccess, "CHECK_OUT", input)
            .await;

        Ok(ScanOutcome::Success(ScanSuccess {
            record_id: record.id,
            direction: ScanDirection::Out,
            shift: qr.shift,
            timestamp: server_time,
            late_minutes: None,
            discount_amount: None,
            status: record.status,
            message: "Salida registrada exitosamente".to_string(),
        }))
    }

    async fn reject(
        &self,
        user_id: Uuid,
        qr_id: Option<Uuid>,
        input: &ScanInput,
        rejection: ScanRejection,
    ) -> ScanOutcome {
        self.audit_scan(
            user_id,
            qr_id,
            AuditAction::ScanFail,
            rejection.code.as_str(),
            input,
        )
        .await;
        ScanOutcome::Rejected(rejection)
    }

    // La bitácora es best-effort: una falla al escribirla no puede tumbar la
    // respuesta del escaneo.
    async fn audit_scan(
        &self,
        user_id: Uuid,
        qr_id: Option<Uuid>,
        action: AuditAction,
        reason: &str,
        input: &ScanInput,
    ) {
        let entry = NewAuditLog {
            user_id,
            qr_id,
            action,
            reason: reason.to_string(),
            latitude: input.latitude,
            longitude: input.longitude,
            accuracy_m: input.accuracy_m,
            ip_address: input.ip_address.clone(),
            user_agent: input.user_agent.clone(),
        };
        if let Err(err) = self.audit.append(entry).await {
            tracing::warn!("No se pudo escribir la bitácora de auditoría: {}", err);
        }
    }
}

// Lo que el paso 4 resuelve para el resto del pipeline.
struct ScanContext {
    direction: ScanDirection,
    attendance_date: NaiveDate,
    existing: Option<crate::models::AttendanceRecord>,
    scheduled_start: Option<chrono::NaiveTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::{AttendanceRecord, AttendanceStatus, Role, Shift};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    const LAT_SEDE: f64 = -12.0464;
    const LNG_SEDE: f64 = -77.0428;

    struct Fixture {
        service: AttendanceService,
        store: Arc<MemoryStore>,
        user_id: Uuid,
        location_id: Uuid,
    }

    // Viernes 6 de febrero de 2026, en hora de Lima
    fn lima(h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::America::Lima
            .with_ymd_and_hms(2026, 2, 6, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn scan_input(token: &str) -> ScanInput {
        ScanInput {
            qr_token: Some(token.to_string()),
            latitude: Some(LAT_SEDE),
            longitude: Some(LNG_SEDE),
            accuracy_m: Some(10.0),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    fn test_user(id: Uuid, active: bool) -> crate::models::User {
        crate::models::User {
            id,
            full_name: "Ana Quispe".to_string(),
            role: Role::Colaborador,
            is_active: active,
            employee_code: format!("EMP-{}", &id.to_string()[..8]),
            login_code: format!("LC-{}", &id.to_string()[..8]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_schedule(user_id: Uuid, day: i16, shift: Shift) -> crate::models::UserSchedule {
        crate::models::UserSchedule {
            id: Uuid::new_v4(),
            user_id,
            day_of_week: day,
            shift,
            start_time: None,
            end_time: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn fixed_qr(token: &str, shift: Shift, location_id: Uuid) -> QrCode {
        QrCode {
            id: Uuid::new_v4(),
            qr_token: token.to_string(),
            qr_type: ScanDirection::In, // valor de relleno en modo fijo
            shift,
            location_id,
            is_fixed: true,
            qr_date: None,
            valid_from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            valid_until: Utc.with_ymd_and_hms(2035, 1, 1, 0, 0, 0).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn dynamic_qr(
        token: &str,
        direction: ScanDirection,
        location_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> QrCode {
        QrCode {
            id: Uuid::new_v4(),
            qr_token: token.to_string(),
            qr_type: direction,
            shift: Shift::Am,
            location_id,
            is_fixed: false,
            qr_date: Some(from.with_timezone(&chrono_tz::America::Lima).date_naive()),
            valid_from: from,
            valid_until: until,
            created_at: Utc::now(),
        }
    }

    fn test_location(id: Uuid) -> crate::models::Location {
        crate::models::Location {
            id,
            name: "Sede Central".to_string(),
            latitude: LAT_SEDE,
            longitude: LNG_SEDE,
            radius_meters: 100.0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let user_id = Uuid::new_v4();
        let location_id = Uuid::new_v4();

        store.add_user(test_user(user_id, true)).await;
        store.add_location(test_location(location_id)).await;
        // Horario de viernes AM (2026-02-06 es viernes → ISO 5)
        store.add_schedule(test_schedule(user_id, 5, Shift::Am)).await;
        store.add_qr(fixed_qr("QR-FIJO-AM", Shift::Am, location_id)).await;

        let rules = Arc::new(crate::config::rules::BusinessRules::default());
        let service = AttendanceService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            rules,
        );

        Fixture {
            service,
            store,
            user_id,
            location_id,
        }
    }

    #[tokio::test]
    async fn check_in_puntual_queda_presente() {
        let fx = fixture().await;
        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();

        let ScanOutcome::Success(success) = outcome else {
            panic!("se esperaba éxito");
        };
        assert_eq!(success.direction, ScanDirection::In);
        assert_eq!(success.status, AttendanceStatus::Presente);
        assert_eq!(success.late_minutes, Some(0));
        assert_eq!(success.discount_amount, Some(Decimal::ZERO));
        assert_eq!(fx.store.record_count().await, 1);
        assert_eq!(fx.store.audit_count().await, 1);
    }

    #[tokio::test]
    async fn check_in_tarde_aplica_descuento_de_tier() {
        let fx = fixture().await;
        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 15))
            .await
            .unwrap();

        let ScanOutcome::Success(success) = outcome else {
            panic!("se esperaba éxito");
        };
        assert_eq!(success.status, AttendanceStatus::Tarde);
        assert_eq!(success.late_minutes, Some(15));
        assert_eq!(success.discount_amount, Some(Decimal::new(500, 2)));
        assert!(success.message.contains("15 min"));
    }

    #[tokio::test]
    async fn entrada_duplicada_se_rechaza_sin_mutar_el_registro() {
        let fx = fixture().await;
        fx.service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();

        // Con QR fijo y entrada previa el sentido inferido es OUT, así que a
        // las 13:30 esto es una salida válida, no un duplicado
        let second = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(13, 30))
            .await
            .unwrap();
        assert!(matches!(second, ScanOutcome::Success(_)));

        // El duplicado de entrada se fuerza con un QR dinámico IN del mismo día

        let qr_in = dynamic_qr(
            "QR-DIN-IN",
            ScanDirection::In,
            fx.location_id,
            lima(5, 0),
            lima(13, 0),
        );
        fx.store.add_qr(qr_in).await;

        let duplicate = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-DIN-IN"), lima(10, 0))
            .await
            .unwrap();
        assert_eq!(
            duplicate.rejection_code(),
            Some(ScanErrorCode::DuplicateCheckIn)
        );

        // El registro conserva la entrada original de las 09:00
        let records = fx.store.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].check_in_time, Some(lima(9, 0)));
        assert_eq!(records[0].late_minutes, 0);
    }

    #[tokio::test]
    async fn flujo_completo_entrada_y_salida() {
        let fx = fixture().await;
        fx.service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();

        let out = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(13, 30))
            .await
            .unwrap();

        let ScanOutcome::Success(success) = out else {
            panic!("se esperaba éxito");
        };
        assert_eq!(success.direction, ScanDirection::Out);

        let records = fx.store.records.lock().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].check_in_time.is_some());
        assert_eq!(records[0].check_out_time, Some(lima(13, 30)));
    }

    #[tokio::test]
    async fn salida_duplicada_es_terminal() {
        let fx = fixture().await;
        fx.service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();
        fx.service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(13, 30))
            .await
            .unwrap();

        let third = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(14, 0))
            .await
            .unwrap();
        assert_eq!(
            third.rejection_code(),
            Some(ScanErrorCode::DuplicateCheckOut)
        );
        assert_eq!(fx.store.record_count().await, 1);
    }

    #[tokio::test]
    async fn salida_sin_entrada_no_crea_registro() {
        let fx = fixture().await;
        let qr_out = dynamic_qr(
            "QR-DIN-OUT",
            ScanDirection::Out,
            fx.location_id,
            lima(13, 0),
            lima(16, 0),
        );
        fx.store.add_qr(qr_out).await;

        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-DIN-OUT"), lima(13, 30))
            .await
            .unwrap();
        assert_eq!(
            outcome.rejection_code(),
            Some(ScanErrorCode::CheckInRequired)
        );
        assert_eq!(fx.store.record_count().await, 0);
    }

    #[tokio::test]
    async fn campos_faltantes_rechazados_antes_de_tocar_persistencia() {
        let fx = fixture().await;
        let mut input = scan_input("QR-FIJO-AM");
        input.accuracy_m = None;

        let outcome = fx
            .service
            .process_scan(fx.user_id, &input, lima(9, 0))
            .await
            .unwrap();
        assert_eq!(outcome.rejection_code(), Some(ScanErrorCode::MissingFields));
        assert_eq!(fx.store.record_count().await, 0);
        assert_eq!(fx.store.audit_count().await, 1);
    }

    #[tokio::test]
    async fn token_desconocido_es_rechazado() {
        let fx = fixture().await;
        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("NO-EXISTE"), lima(9, 0))
            .await
            .unwrap();
        assert_eq!(
            outcome.rejection_code(),
            Some(ScanErrorCode::InvalidQrToken)
        );
    }

    #[tokio::test]
    async fn usuario_inactivo_o_inexistente() {
        let fx = fixture().await;
        let inactive_id = Uuid::new_v4();
        fx.store.add_user(test_user(inactive_id, false)).await;

        let outcome = fx
            .service
            .process_scan(inactive_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();
        assert_eq!(outcome.rejection_code(), Some(ScanErrorCode::UserInactive));

        let ghost = fx
            .service
            .process_scan(Uuid::new_v4(), &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();
        assert_eq!(ghost.rejection_code(), Some(ScanErrorCode::UserInactive));
    }

    #[tokio::test]
    async fn sin_horario_programado_para_el_dia() {
        let fx = fixture().await;
        let other_id = Uuid::new_v4();
        fx.store.add_user(test_user(other_id, true)).await;

        let outcome = fx
            .service
            .process_scan(other_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();
        assert_eq!(
            outcome.rejection_code(),
            Some(ScanErrorCode::ScheduleMismatch)
        );
    }

    #[tokio::test]
    async fn fuera_de_ventana_demasiado_temprano() {
        let fx = fixture().await;
        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(4, 30))
            .await
            .unwrap();

        let ScanOutcome::Rejected(rejection) = outcome else {
            panic!("se esperaba rechazo");
        };
        assert_eq!(rejection.code, ScanErrorCode::OutOfWindow);
        assert!(rejection.message.contains("Aún no es hora"));
    }

    #[tokio::test]
    async fn accuracy_gps_insuficiente_devuelve_umbral() {
        let fx = fixture().await;
        let mut input = scan_input("QR-FIJO-AM");
        input.accuracy_m = Some(800.0);

        let outcome = fx
            .service
            .process_scan(fx.user_id, &input, lima(9, 0))
            .await
            .unwrap();

        let ScanOutcome::Rejected(rejection) = outcome else {
            panic!("se esperaba rechazo");
        };
        assert_eq!(rejection.code, ScanErrorCode::GpsAccuracyTooLow);
        let extra = rejection.extra.unwrap();
        assert_eq!(extra["accuracy"], 800.0);
        assert_eq!(extra["threshold"], 50.0);
    }

    #[tokio::test]
    async fn fuera_del_geofence_devuelve_distancia() {
        let fx = fixture().await;
        let mut input = scan_input("QR-FIJO-AM");
        // ~222m al sur de la sede, radio de 100m
        input.latitude = Some(LAT_SEDE - 0.002);

        let outcome = fx
            .service
            .process_scan(fx.user_id, &input, lima(9, 0))
            .await
            .unwrap();

        let ScanOutcome::Rejected(rejection) = outcome else {
            panic!("se esperaba rechazo");
        };
        assert_eq!(rejection.code, ScanErrorCode::LocationOutOfRange);
        let extra = rejection.extra.unwrap();
        assert!(extra["distance_meters"].as_f64().unwrap() > 100.0);
        assert_eq!(extra["max_allowed"], 100.0);
    }

    #[tokio::test]
    async fn qr_dinamico_expirado() {
        let fx = fixture().await;
        let qr = dynamic_qr(
            "QR-DIN-VIEJO",
            ScanDirection::In,
            fx.location_id,
            lima(5, 0),
            lima(13, 0),
        );
        fx.store.add_qr(qr).await;

        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-DIN-VIEJO"), lima(14, 0))
            .await
            .unwrap();
        assert_eq!(outcome.rejection_code(), Some(ScanErrorCode::QrExpired));
    }

    #[tokio::test]
    async fn qr_dinamico_vigente_registra_entrada() {
        let fx = fixture().await;
        let qr = dynamic_qr(
            "QR-DIN-HOY",
            ScanDirection::In,
            fx.location_id,
            lima(5, 0),
            lima(13, 0),
        );
        fx.store.add_qr(qr).await;

        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-DIN-HOY"), lima(9, 5))
            .await
            .unwrap();

        let ScanOutcome::Success(success) = outcome else {
            panic!("se esperaba éxito");
        };
        // 5 min de tardanza: dentro de tolerancia
        assert_eq!(success.late_minutes, Some(5));
        assert_eq!(success.status, AttendanceStatus::Presente);
    }

    #[tokio::test]
    async fn falta_previa_se_completa_con_entrada_sin_duplicar_fila() {
        let fx = fixture().await;
        // El barrido dejó una FALTA para hoy
        fx.store
            .create_absence(&crate::db::NewAbsence {
                user_id: fx.user_id,
                attendance_date: chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
                shift: Shift::Am,
                discount_amount: Decimal::new(4600, 2),
            })
            .await
            .unwrap();

        let outcome = fx
            .service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();

        assert!(matches!(outcome, ScanOutcome::Success(_)));
        let records = fx.store.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Presente);
        assert!(records[0].check_in_time.is_some());
    }

    #[tokio::test]
    async fn cada_intento_escribe_exactamente_una_auditoria() {
        let fx = fixture().await;
        fx.service
            .process_scan(fx.user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();
        fx.service
            .process_scan(fx.user_id, &scan_input("NO-EXISTE"), lima(9, 1))
            .await
            .unwrap();
        let mut input = scan_input("QR-FIJO-AM");
        input.latitude = None;
        fx.service
            .process_scan(fx.user_id, &input, lima(9, 2))
            .await
            .unwrap();

        assert_eq!(fx.store.audit_count().await, 3);
    }

    // Store que siempre pierde la carrera de escritura: simula que otro
    // escaneo concurrente llegó primero al índice único o al UPDATE guardado.
    struct PerdedorDeCarrera {
        existing: Option<AttendanceRecord>,
    }

    #[async_trait::async_trait]
    impl AttendanceStore for PerdedorDeCarrera {
        async fn find_by_key(
            &self,
            _user_id: Uuid,
            _date: NaiveDate,
            _shift: Shift,
        ) -> Result<Option<AttendanceRecord>, AppError> {
            Ok(self.existing.clone())
        }

        async fn create_check_in(&self, _data: &NewCheckIn) -> Result<AttendanceRecord, AppError> {
            Err(AppError::DuplicateAttendance)
        }

        async fn apply_check_in(
            &self,
            _record_id: Uuid,
            _data: &NewCheckIn,
        ) -> Result<AttendanceRecord, AppError> {
            Err(AppError::DuplicateAttendance)
        }

        async fn apply_check_out(
            &self,
            _record_id: Uuid,
            _data: &CheckOut,
        ) -> Result<AttendanceRecord, AppError> {
            Err(AppError::DuplicateAttendance)
        }

        async fn create_absence(
            &self,
            _data: &crate::db::NewAbsence,
        ) -> Result<Option<AttendanceRecord>, AppError> {
            Ok(None)
        }

        async fn list_for_user(
            &self,
            _user_id: Uuid,
            _range: Option<(NaiveDate, NaiveDate)>,
            _limit: i64,
        ) -> Result<Vec<AttendanceRecord>, AppError> {
            Ok(Vec::new())
        }
    }

    fn existing_record(
        check_in: Option<DateTime<Utc>>,
        status: AttendanceStatus,
    ) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            qr_id: None,
            attendance_date: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            shift: Shift::Am,
            check_in_time: check_in,
            check_in_lat: None,
            check_in_lng: None,
            check_in_accuracy_m: None,
            check_out_time: None,
            check_out_lat: None,
            check_out_lng: None,
            check_out_accuracy_m: None,
            late_minutes: 0,
            discount_amount: Decimal::ZERO,
            status,
            is_justified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn race_fixture(
        existing: Option<AttendanceRecord>,
    ) -> (AttendanceService, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let user_id = Uuid::new_v4();
        let location_id = Uuid::new_v4();

        store.add_user(test_user(user_id, true)).await;
        store.add_location(test_location(location_id)).await;
        store.add_schedule(test_schedule(user_id, 5, Shift::Am)).await;
        store.add_qr(fixed_qr("QR-FIJO-AM", Shift::Am, location_id)).await;

        let service = AttendanceService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(PerdedorDeCarrera { existing }),
            store.clone(),
            Arc::new(crate::config::rules::BusinessRules::default()),
        );
        (service, store, user_id)
    }

    #[tokio::test]
    async fn carrera_de_insercion_se_mapea_a_entrada_duplicada() {
        // find_by_key no ve nada, pero el INSERT choca con el índice único
        let (service, store, user_id) = race_fixture(None).await;

        let outcome = service
            .process_scan(user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();

        assert_eq!(
            outcome.rejection_code(),
            Some(ScanErrorCode::DuplicateCheckIn)
        );
        assert_eq!(store.audit_count().await, 1);
    }

    #[tokio::test]
    async fn carrera_al_regularizar_falta_se_mapea_a_entrada_duplicada() {
        let falta = existing_record(None, AttendanceStatus::Falta);
        let (service, _store, user_id) = race_fixture(Some(falta)).await;

        let outcome = service
            .process_scan(user_id, &scan_input("QR-FIJO-AM"), lima(9, 0))
            .await
            .unwrap();

        assert_eq!(
            outcome.rejection_code(),
            Some(ScanErrorCode::DuplicateCheckIn)
        );
    }

    #[tokio::test]
    async fn carrera_de_salida_se_mapea_a_salida_duplicada() {
        let con_entrada = existing_record(Some(lima(9, 0)), AttendanceStatus::Presente);
        let (service, _store, user_id) = race_fixture(Some(con_entrada)).await;

        let outcome = service
            .process_scan(user_id, &scan_input("QR-FIJO-AM"), lima(13, 30))
            .await
            .unwrap();

        assert_eq!(
            outcome.rejection_code(),
            Some(ScanErrorCode::DuplicateCheckOut)
        );
    }
}
