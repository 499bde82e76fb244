// src/services/lateness.rs

use chrono::{DateTime, NaiveTime};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::common::clock::local_datetime;
use crate::config::rules::BusinessRules;
use crate::models::{AttendanceStatus, Shift};

#[derive(Debug, Clone, PartialEq)]
pub struct LatenessResult {
    pub late_minutes: i32,
    pub discount_amount: Decimal,
    pub status: AttendanceStatus,
}

/// Calcula los minutos de tardanza y el monto de descuento de un check-in.
///
/// La hora programada sale del override del horario del usuario si existe,
/// o del inicio global del turno. La diferencia se trunca hacia cero (minutos
/// enteros) y la tabla de tiers aplica igual para todos los roles.
pub fn calc_late_and_discount(
    rules: &BusinessRules,
    shift: Shift,
    check_in: DateTime<Tz>,
    scheduled_start: Option<NaiveTime>,
) -> LatenessResult {
    let start_time = scheduled_start.unwrap_or_else(|| rules.shift_start(shift));
    let start = local_datetime(rules.timezone, check_in.date_naive(), start_time);

    let diff_minutes = (check_in - start).num_minutes();

    // Llegó antes o exacto: nunca se penaliza
    if diff_minutes <= 0 {
        return LatenessResult {
            late_minutes: 0,
            discount_amount: Decimal::ZERO,
            status: AttendanceStatus::Presente,
        };
    }

    // Dentro de la tolerancia: tarde pero perdonado
    if diff_minutes <= rules.late_tolerance_minutes {
        return LatenessResult {
            late_minutes: diff_minutes as i32,
            discount_amount: Decimal::ZERO,
            status: AttendanceStatus::Presente,
        };
    }

    LatenessResult {
        late_minutes: diff_minutes as i32,
        discount_amount: rules.discount_for(diff_minutes),
        status: AttendanceStatus::Tarde,
    }
}
