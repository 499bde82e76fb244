// src/services/qr_service.rs
//
// Generación de códigos QR: los dinámicos del día (uno por sentido y turno,
// con validez igual a su ventana de escaneo) y el aprovisionamiento del QR
// fijo permanente de cada turno.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use uuid::Uuid;

use crate::common::clock::BusinessClock;
use crate::common::error::AppError;
use crate::config::rules::BusinessRules;
use crate::db::{NewQrCode, QrRepository};
use crate::models::{QrCode, ScanDirection, Shift};

/// Turnos que operan en un día ISO (1 = lunes). Sábado solo AM; domingo nada.
fn shifts_for(iso_day: i16) -> Option<Vec<Shift>> {
    match iso_day {
        1..=5 => Some(vec![Shift::Am, Shift::Pm]),
        6 => Some(vec![Shift::Am]),
        _ => None,
    }
}

#[derive(Clone)]
pub struct QrService {
    repo: QrRepository,
    rules: Arc<BusinessRules>,
    clock: BusinessClock,
}

impl QrService {
    pub fn new(repo: QrRepository, rules: Arc<BusinessRules>) -> Self {
        let clock = BusinessClock::new(rules.timezone);
        Self { repo, rules, clock }
    }

    /// Genera los QRs dinámicos del día de negocio de `now`. Idempotente:
    /// si ya existen, los devuelve tal cual.
    pub async fn generate_today(&self, now: DateTime<Utc>) -> Result<Vec<QrCode>, AppError> {
        let date = self.clock.business_date(now);
        let iso_day = date.weekday().number_from_monday() as i16;

        let Some(shifts) = shifts_for(iso_day) else {
            return Err(AppError::NoShiftsOnSunday);
        };

        let location = self
            .repo
            .find_active_location()
            .await?
            .ok_or(AppError::LocationNotFound)?;

        let existing = self.repo.find_by_date(date).await?;
        if !existing.is_empty() {
            tracing::info!("ℹ️ QRs del {date} ya generados ({})", existing.len());
            return Ok(existing);
        }

        let mut generated = Vec::new();
        for shift in shifts {
            for direction in [ScanDirection::In, ScanDirection::Out] {
                let window = self.rules.scan_window(direction, shift);
                let inserted = self
                    .repo
                    .create_daily(&NewQrCode {
                        qr_token: Uuid::new_v4().to_string(),
                        qr_type: direction,
                        shift,
                        location_id: location.id,
                        is_fixed: false,
                        qr_date: Some(date),
                        valid_from: self.clock.at(date, window.from).with_timezone(&Utc),
                        valid_until: self.clock.at(date, window.until).with_timezone(&Utc),
                    })
                    .await?;
                match inserted {
                    Some(qr) => generated.push(qr),
                    // Otro generador concurrente ganó la carrera: devolvemos
                    // el juego del día tal como quedó
                    None => {
                        tracing::info!("ℹ️ QRs del {date} generados por otro proceso");
                        return self.repo.find_by_date(date).await;
                    }
                }
            }
        }

        tracing::info!("✅ {} QRs generados para {date}", generated.len());
        Ok(generated)
    }

    pub async fn get_today(&self, now: DateTime<Utc>) -> Result<Vec<QrCode>, AppError> {
        let date = self.clock.business_date(now);
        self.repo.find_by_date(date).await
    }

    /// Devuelve el QR fijo del turno, creándolo si aún no existe. El sentido
    /// almacenado es de relleno: en modo fijo se infiere en cada escaneo.
    pub async fn ensure_fixed(&self, shift: Shift, now: DateTime<Utc>) -> Result<QrCode, AppError> {
        if let Some(qr) = self.repo.find_fixed_by_shift(shift).await? {
            return Ok(qr);
        }

        let location = self
            .repo
            .find_active_location()
            .await?
            .ok_or(AppError::LocationNotFound)?;

        let qr = self
            .repo
            .create(&NewQrCode {
                qr_token: Uuid::new_v4().to_string(),
                qr_type: ScanDirection::In,
                shift,
                location_id: location.id,
                is_fixed: true,
                qr_date: None,
                valid_from: now,
                valid_until: now + Duration::days(3650),
            })
            .await?;

        tracing::info!("✅ QR fijo aprovisionado para turno {shift}");
        Ok(qr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lunes_a_viernes_operan_ambos_turnos() {
        for day in 1..=5 {
            assert_eq!(shifts_for(day), Some(vec![Shift::Am, Shift::Pm]));
        }
    }

    #[test]
    fn sabado_solo_turno_am() {
        assert_eq!(shifts_for(6), Some(vec![Shift::Am]));
    }

    #[test]
    fn domingo_no_opera() {
        assert_eq!(shifts_for(7), None);
    }
}
