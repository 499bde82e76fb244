// src/db/qr_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{Location, QrCode, ScanDirection, Shift},
};

// Resolución de tokens QR y de la sede del geofence.
#[async_trait]
pub trait QrStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<QrCode>, AppError>;
    async fn find_location(&self, id: Uuid) -> Result<Option<Location>, AppError>;
}

#[derive(Debug, Clone)]
pub struct NewQrCode {
    pub qr_token: String,
    pub qr_type: ScanDirection,
    pub shift: Shift,
    pub location_id: Uuid,
    pub is_fixed: bool,
    pub qr_date: Option<NaiveDate>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QrRepository {
    pool: PgPool,
}

impl QrRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: &NewQrCode) -> Result<QrCode, AppError> {
        let qr = sqlx::query_as::<_, QrCode>(
            r#"
            INSERT INTO qr_codes (qr_token, qr_type, shift, location_id, is_fixed, qr_date, valid_from, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&data.qr_token)
        .bind(data.qr_type)
        .bind(data.shift)
        .bind(data.location_id)
        .bind(data.is_fixed)
        .bind(data.qr_date)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .fetch_one(&self.pool)
        .await?;
        Ok(qr)
    }

    /// Inserta un QR dinámico del día. `None` cuando otro generador
    /// concurrente ya creó el de esa (fecha, turno, sentido).
    pub async fn create_daily(&self, data: &NewQrCode) -> Result<Option<QrCode>, AppError> {
        let maybe_qr = sqlx::query_as::<_, QrCode>(
            r#"
            INSERT INTO qr_codes (qr_token, qr_type, shift, location_id, is_fixed, qr_date, valid_from, valid_until)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6, $7)
            ON CONFLICT (qr_date, shift, qr_type) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&data.qr_token)
        .bind(data.qr_type)
        .bind(data.shift)
        .bind(data.location_id)
        .bind(data.qr_date)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_qr)
    }

    /// QRs dinámicos generados para una fecha.
    pub async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<QrCode>, AppError> {
        let qrs = sqlx::query_as::<_, QrCode>(
            "SELECT * FROM qr_codes WHERE qr_date = $1 ORDER BY shift, qr_type",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(qrs)
    }

    /// El QR permanente de un turno, si ya fue aprovisionado.
    pub async fn find_fixed_by_shift(&self, shift: Shift) -> Result<Option<QrCode>, AppError> {
        let maybe_qr = sqlx::query_as::<_, QrCode>(
            "SELECT * FROM qr_codes WHERE is_fixed = TRUE AND shift = $1 LIMIT 1",
        )
        .bind(shift)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_qr)
    }

    /// La única sede activa (el sistema asume una sola).
    pub async fn find_active_location(&self) -> Result<Option<Location>, AppError> {
        let maybe_location = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE is_active = TRUE LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_location)
    }
}

#[async_trait]
impl QrStore for QrRepository {
    async fn find_by_token(&self, token: &str) -> Result<Option<QrCode>, AppError> {
        let maybe_qr = sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE qr_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_qr)
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<Location>, AppError> {
        let maybe_location = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_location)
    }
}
