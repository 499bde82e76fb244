// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{common::error::AppError, models::NewAuditLog};

// Bitácora append-only. Quien la consume decide si una falla al escribir es
// fatal; para el motor de escaneo no lo es (best effort).
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: NewAuditLog) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for AuditRepository {
    async fn append(&self, entry: NewAuditLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                user_id, qr_id, action, reason,
                latitude, longitude, accuracy_m, ip_address, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.qr_id)
        .bind(entry.action)
        .bind(&entry.reason)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(entry.accuracy_m)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
