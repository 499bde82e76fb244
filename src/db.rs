pub mod attendance_repo;
pub mod audit_repo;
pub mod qr_repo;
pub mod schedule_repo;
pub mod user_repo;

#[cfg(test)]
pub mod memory;

pub use attendance_repo::{AttendanceRepository, AttendanceStore, CheckOut, NewAbsence, NewCheckIn};
pub use audit_repo::{AuditRepository, AuditStore};
pub use qr_repo::{NewQrCode, QrRepository, QrStore};
pub use schedule_repo::{NewScheduleItem, ScheduleRepository, ScheduleStore};
pub use user_repo::{UserRepository, UserStore};
