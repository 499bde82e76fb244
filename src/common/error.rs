use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nuestro tipo de error, con `thiserror` para mejor ergonomía.
// Los rechazos de escaneo NO viven aquí: esos son resultados esperados del
// motor de decisión y se modelan como `ScanOutcome::Rejected`. Aquí solo van
// errores de infraestructura y de las rutas administrativas.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("No hay sedes configuradas")]
    LocationNotFound,

    #[error("No hay turnos los domingos")]
    NoShiftsOnSunday,

    // Violación del índice único (user_id, attendance_date, shift).
    // El motor de escaneo la traduce a DUPLICATE_CHECK_IN.
    #[error("Ya existe un registro de asistencia para ese turno")]
    DuplicateAttendance,

    #[error("Falta el encabezado de identidad del usuario")]
    MissingUserHeader,

    #[error("No tiene permisos para esta operación")]
    Forbidden,

    // Variante para errores de base de datos (sqlx)
    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para cualquier otro error inesperado.
    #[error("Error interno del servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            // Devolvemos todos los detalles de la validación.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "VALIDATION_ERROR",
                    "message": "Uno o más campos son inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                "Usuario no encontrado.",
            ),
            AppError::LocationNotFound => (
                StatusCode::NOT_FOUND,
                "LOCATION_NOT_FOUND",
                "No hay sedes configuradas. Por favor contacta al administrador del sistema.",
            ),
            AppError::NoShiftsOnSunday => (
                StatusCode::BAD_REQUEST,
                "NO_SHIFTS_ON_SUNDAY",
                "No hay turnos los domingos.",
            ),
            AppError::DuplicateAttendance => (
                StatusCode::CONFLICT,
                "DUPLICATE_RECORD",
                "Ya existe un registro de asistencia para ese turno.",
            ),
            AppError::MissingUserHeader => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Identidad del usuario ausente o inválida.",
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "No tiene permisos para esta operación.",
            ),

            // Todos los demás (DatabaseError, InternalServerError) son 500.
            // `tracing` registra el detalle que `thiserror` nos da.
            ref e => {
                tracing::error!("Error interno del servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Ocurrió un error inesperado.",
                )
            }
        };

        let body = Json(json!({ "error": code, "message": message }));
        (status, body).into_response()
    }
}
