// src/services/schedule_service.rs
//
// Horario semanal de un usuario: lectura y reemplazo completo. El usuario
// debe existir; la validación de forma (días 1..6, horas) ocurre en el
// handler con `validator`.

use std::sync::Arc;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{NewScheduleItem, ScheduleRepository, UserStore};
use crate::models::UserSchedule;

#[derive(Clone)]
pub struct ScheduleService {
    repo: ScheduleRepository,
    users: Arc<dyn UserStore>,
}

impl ScheduleService {
    pub fn new(repo: ScheduleRepository, users: Arc<dyn UserStore>) -> Self {
        Self { repo, users }
    }

    pub async fn get_for_user(&self, user_id: Uuid) -> Result<Vec<UserSchedule>, AppError> {
        self.ensure_user(user_id).await?;
        self.repo.list_for_user(user_id).await
    }

    /// Reemplaza el horario completo del usuario. Todo o nada: la
    /// transacción vive en el repositorio.
    pub async fn replace_for_user(
        &self,
        user_id: Uuid,
        items: Vec<NewScheduleItem>,
    ) -> Result<Vec<UserSchedule>, AppError> {
        self.ensure_user(user_id).await?;
        self.repo.replace_for_user(user_id, &items).await?;
        tracing::info!("✅ Horario reemplazado para {user_id}: {} entradas", items.len());
        self.repo.list_for_user(user_id).await
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        Ok(())
    }
}
