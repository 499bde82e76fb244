// src/models/audit.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ScanSuccess,
    ScanFail,
    AutoAbsence,
    Logout,
}

// Entrada nueva de la bitácora. Cada intento de escaneo (exitoso o no) genera
// exactamente una, con las coordenadas/accuracy/IP/user-agent que llegaron;
// los campos que aún no se conocen en salidas tempranas quedan en NULL.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub user_id: Uuid,
    pub qr_id: Option<Uuid>,
    pub action: AuditAction,
    pub reason: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
