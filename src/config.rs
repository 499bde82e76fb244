// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::{
    AttendanceRepository, AuditRepository, QrRepository, ScheduleRepository, UserRepository,
};
use crate::services::{
    AbsenceService, AttendanceService, QrService, ReportService, ScheduleService,
};

pub mod rules;

use rules::BusinessRules;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub attendance_service: AttendanceService,
    pub absence_service: AbsenceService,
    pub qr_service: QrService,
    pub schedule_service: ScheduleService,
    pub report_service: ReportService,
    pub user_repo: UserRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL debe estar definida");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexión con la base de datos establecida");

        let rules = Arc::new(BusinessRules::from_env()?);
        tracing::info!(
            "✅ Reglas de negocio cargadas (zona horaria: {})",
            rules.timezone
        );

        // --- Grafo de dependencias ---
        let user_repo = UserRepository::new(db_pool.clone());
        let schedule_repo = ScheduleRepository::new(db_pool.clone());
        let qr_repo = QrRepository::new(db_pool.clone());
        let attendance_repo = AttendanceRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        let attendance_service = AttendanceService::new(
            Arc::new(user_repo.clone()),
            Arc::new(schedule_repo.clone()),
            Arc::new(qr_repo.clone()),
            Arc::new(attendance_repo.clone()),
            Arc::new(audit_repo.clone()),
            rules.clone(),
        );

        let absence_service = AbsenceService::new(
            Arc::new(schedule_repo.clone()),
            Arc::new(attendance_repo.clone()),
            Arc::new(audit_repo),
            rules.clone(),
        );

        let qr_service = QrService::new(qr_repo, rules.clone());
        let schedule_service = ScheduleService::new(schedule_repo, Arc::new(user_repo.clone()));
        let report_service = ReportService::new(attendance_repo, rules.timezone);

        Ok(Self {
            db_pool,
            attendance_service,
            absence_service,
            qr_service,
            schedule_service,
            report_service,
            user_repo,
        })
    }
}
