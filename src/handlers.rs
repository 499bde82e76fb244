// src/handlers.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::db::UserStore;
use crate::models::Role;

pub mod attendance;
pub mod jobs;
pub mod qr;
pub mod schedule;

// Identidad del usuario autenticado. El gateway de autenticación vive fuera
// de este servicio y nos la entrega ya verificada en el header `x-user-id`.
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::MissingUserHeader)?;
        let id = Uuid::parse_str(raw).map_err(|_| AppError::MissingUserHeader)?;
        Ok(CurrentUser(id))
    }
}

/// Guardia de rol para las rutas administrativas.
pub(crate) async fn require_admin(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let user = state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    if user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
