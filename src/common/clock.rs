// src/common/clock.rs

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Interpreta (fecha, hora) como hora local de la zona de negocio.
/// Lima no tiene horario de verano, así que la conversión es unívoca; el
/// fallback existe solo para zonas con huecos de DST.
pub fn local_datetime(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

// El "reloj de negocio": todas las comparaciones de "hoy", ventanas de escaneo
// y cortes de fecha pasan por aquí, nunca por la hora local del servidor.
#[derive(Clone, Copy)]
pub struct BusinessClock {
    tz: Tz,
}

impl BusinessClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Convierte un instante UTC a la zona de negocio.
    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// Fecha de negocio de un instante dado (normalizada a la zona).
    pub fn business_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    /// (fecha, hora) local → instante en la zona de negocio.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        local_datetime(self.tz, date, time)
    }
}
