// src/db/schedule_repo.rs

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{schedule::SweepCandidate, Shift, UserSchedule},
};

// Lo que necesitan el motor de escaneo (¿tiene turno hoy?) y el job de
// faltas (¿quiénes debían venir hoy?).
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn find_for(
        &self,
        user_id: Uuid,
        day_of_week: i16,
        shift: Shift,
    ) -> Result<Option<UserSchedule>, AppError>;

    /// Horarios activos de usuarios activos para (día ISO, turno).
    async fn sweep_candidates(
        &self,
        day_of_week: i16,
        shift: Shift,
    ) -> Result<Vec<SweepCandidate>, AppError>;
}

#[derive(Debug, Clone)]
pub struct NewScheduleItem {
    pub day_of_week: i16,
    pub shift: Shift,
    pub is_active: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UserSchedule>, AppError> {
        let schedules = sqlx::query_as::<_, UserSchedule>(
            r#"
            SELECT * FROM user_schedules
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY day_of_week ASC, shift ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    /// Reemplazo completo del horario semanal: borra e inserta dentro de una
    /// misma transacción, para que nunca quede un horario a medias.
    pub async fn replace_for_user(
        &self,
        user_id: Uuid,
        items: &[NewScheduleItem],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_schedules WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO user_schedules (user_id, day_of_week, shift, is_active, start_time, end_time)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(user_id)
            .bind(item.day_of_week)
            .bind(item.shift)
            .bind(item.is_active)
            .bind(item.start_time)
            .bind(item.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn find_for(
        &self,
        user_id: Uuid,
        day_of_week: i16,
        shift: Shift,
    ) -> Result<Option<UserSchedule>, AppError> {
        let maybe_schedule = sqlx::query_as::<_, UserSchedule>(
            r#"
            SELECT * FROM user_schedules
            WHERE user_id = $1 AND day_of_week = $2 AND shift = $3
            "#,
        )
        .bind(user_id)
        .bind(day_of_week)
        .bind(shift)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_schedule)
    }

    async fn sweep_candidates(
        &self,
        day_of_week: i16,
        shift: Shift,
    ) -> Result<Vec<SweepCandidate>, AppError> {
        let candidates = sqlx::query_as::<_, SweepCandidate>(
            r#"
            SELECT s.user_id, u.full_name, u.role, s.start_time
            FROM user_schedules s
            JOIN users u ON u.id = s.user_id
            WHERE s.day_of_week = $1
              AND s.shift = $2
              AND s.is_active = TRUE
              AND u.is_active = TRUE
            "#,
        )
        .bind(day_of_week)
        .bind(shift)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }
}
