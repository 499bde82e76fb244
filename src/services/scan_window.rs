// src/services/scan_window.rs
//
// Legalidad temporal de un intento de escaneo, independiente del geofence.
// Modo fijo: ventanas globales por clave {sentido}_{turno} sobre la hora
// local de negocio. Modo dinámico: el QR trae su propia validez explícita
// [valid_from, valid_until], regla única y estricta para todos los roles.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::config::rules::BusinessRules;
use crate::models::{qr::ScanDirection, QrCode, Shift};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    Allowed,
    // Separamos "temprano" de "tarde" para que el mensaje al usuario sea útil
    TooEarly { opens: NaiveTime },
    TooLate { closed: NaiveTime },
}

#[derive(Clone)]
pub struct ScanWindowPolicy {
    rules: Arc<BusinessRules>,
}

impl ScanWindowPolicy {
    pub fn new(rules: Arc<BusinessRules>) -> Self {
        Self { rules }
    }

    /// Modo fijo: ¿cae la hora local dentro de la ventana del sentido/turno?
    /// Ambos extremos son inclusive.
    pub fn check_fixed(
        &self,
        direction: ScanDirection,
        shift: Shift,
        local_now: DateTime<Tz>,
    ) -> WindowDecision {
        let window = self.rules.scan_window(direction, shift);
        let time = local_now.time();

        if window.contains(time) {
            WindowDecision::Allowed
        } else if time < window.from {
            WindowDecision::TooEarly {
                opens: window.from,
            }
        } else {
            WindowDecision::TooLate {
                closed: window.until,
            }
        }
    }

    /// Modo dinámico: validez estricta del propio QR.
    pub fn check_dynamic(&self, qr: &QrCode, now: DateTime<Utc>) -> bool {
        now >= qr.valid_from && now <= qr.valid_until
    }
}
