// src/config/rules.rs
//
// Reglas de negocio del sistema de asistencias, como objeto inmutable que se
// inyecta en los servicios al construirlos. Nada de constantes globales
// mutables: así cada borde de tier y de ventana se puede testear en forma
// determinista.

use std::env;

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::models::{qr::ScanDirection, Shift};

// --- Ventana de escaneo (hora local, ambos extremos inclusive) ---
#[derive(Debug, Clone, Copy)]
pub struct ScanWindow {
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl ScanWindow {
    fn new(from: (u32, u32), until: (u32, u32)) -> Self {
        Self {
            from: NaiveTime::from_hms_opt(from.0, from.1, 0).unwrap(),
            until: NaiveTime::from_hms_opt(until.0, until.1, 0).unwrap(),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.from && time <= self.until
    }
}

// --- Tier de descuento por tardanza ---
// Rango de minutos [min, max] → monto fijo. `max = None` significa "en
// adelante". La tabla es única para todos los roles.
#[derive(Debug, Clone)]
pub struct DiscountTier {
    pub min_minutes: i64,
    pub max_minutes: Option<i64>,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct BusinessRules {
    // Zona horaria de negocio: toda comparación de fechas y ventanas la usa
    pub timezone: Tz,

    // Horas de inicio por defecto de cada turno (override por horario de usuario)
    pub shift_start_am: NaiveTime,
    pub shift_start_pm: NaiveTime,

    // Ventanas de escaneo para QR fijo. OUT_AM e IN_PM se solapan a propósito
    // para cubrir la transición de turno.
    pub window_in_am: ScanWindow,
    pub window_out_am: ScanWindow,
    pub window_in_pm: ScanWindow,
    pub window_out_pm: ScanWindow,

    // Tolerancia de tardanza sin descuento, en minutos
    pub late_tolerance_minutes: i64,

    // Tabla ordenada y sin solapes de descuentos por tardanza (en soles)
    pub discount_tiers: Vec<DiscountTier>,

    // Descuento por falta sin aviso (COLABORADOR y PRACTICANTE)
    pub absence_discount: Decimal,

    // Límite de accuracy GPS aceptable (metros)
    pub gps_accuracy_threshold_m: f64,
}

impl BusinessRules {
    /// Carga los overrides desde el entorno sobre los valores por defecto.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut rules = Self::default();

        if let Ok(tz) = env::var("TIMEZONE") {
            rules.timezone = tz
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("TIMEZONE inválida: {e}"))?;
        }
        if let Ok(threshold) = env::var("GPS_ACCURACY_THRESHOLD_M") {
            rules.gps_accuracy_threshold_m = threshold.parse()?;
        }
        if let Ok(tolerance) = env::var("LATE_TOLERANCE_MINUTES") {
            rules.late_tolerance_minutes = tolerance.parse()?;
        }

        Ok(rules)
    }

    pub fn shift_start(&self, shift: Shift) -> NaiveTime {
        match shift {
            Shift::Am => self.shift_start_am,
            Shift::Pm => self.shift_start_pm,
        }
    }

    /// Ventana para la clave `{sentido}_{turno}` (IN_AM, OUT_PM, ...).
    pub fn scan_window(&self, direction: ScanDirection, shift: Shift) -> &ScanWindow {
        match (direction, shift) {
            (ScanDirection::In, Shift::Am) => &self.window_in_am,
            (ScanDirection::Out, Shift::Am) => &self.window_out_am,
            (ScanDirection::In, Shift::Pm) => &self.window_in_pm,
            (ScanDirection::Out, Shift::Pm) => &self.window_out_pm,
        }
    }

    /// Monto de descuento para una tardanza ya fuera de tolerancia.
    pub fn discount_for(&self, late_minutes: i64) -> Decimal {
        for tier in &self.discount_tiers {
            let within_max = tier.max_minutes.is_none_or(|max| late_minutes <= max);
            if late_minutes >= tier.min_minutes && within_max {
                return tier.amount;
            }
        }
        Decimal::ZERO
    }
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Lima,
            shift_start_am: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            shift_start_pm: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            window_in_am: ScanWindow::new((5, 0), (13, 0)),
            window_out_am: ScanWindow::new((13, 0), (16, 0)),
            window_in_pm: ScanWindow::new((12, 0), (19, 0)),
            window_out_pm: ScanWindow::new((19, 0), (23, 59)),
            late_tolerance_minutes: 9,
            discount_tiers: vec![
                DiscountTier {
                    min_minutes: 10,
                    max_minutes: Some(19),
                    amount: Decimal::new(500, 2), // S/ 5.00
                },
                DiscountTier {
                    min_minutes: 20,
                    max_minutes: Some(29),
                    amount: Decimal::new(1000, 2), // S/ 10.00
                },
                DiscountTier {
                    min_minutes: 30,
                    max_minutes: Some(59),
                    amount: Decimal::new(1300, 2), // S/ 13.00
                },
                DiscountTier {
                    min_minutes: 60,
                    max_minutes: None,
                    amount: Decimal::new(2300, 2), // S/ 23.00
                },
            ],
            absence_discount: Decimal::new(4600, 2), // S/ 46.00
            gps_accuracy_threshold_m: 50.0,
        }
    }
}
