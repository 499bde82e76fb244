pub mod attendance;
pub mod audit;
pub mod qr;
pub mod scan;
pub mod schedule;
pub mod user;

pub use attendance::{AttendanceRecord, AttendanceStatus, Shift};
pub use audit::{AuditAction, NewAuditLog};
pub use qr::{Location, QrCode, ScanDirection};
pub use schedule::UserSchedule;
pub use user::{Role, User};
