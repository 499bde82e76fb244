pub mod absence_service;
pub mod attendance_service;
pub mod lateness;
pub mod qr_service;
pub mod report_service;
pub mod scan_window;
pub mod schedule_service;

pub use absence_service::AbsenceService;
pub use attendance_service::AttendanceService;
pub use qr_service::QrService;
pub use report_service::ReportService;
pub use schedule_service::ScheduleService;
