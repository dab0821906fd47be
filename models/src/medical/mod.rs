// models/src/medical/mod.rs

pub mod audit;
pub mod conflict;
pub mod department;
pub mod patient;
pub mod requests;
pub mod user;
pub mod visit;

pub use audit::{AuditAction, AuditLogEntry, FieldChange};
pub use conflict::{ConflictDimension, ScheduleConflict};
pub use department::DepartmentSummary;
pub use patient::PatientSummary;
pub use requests::{CheckInRequest, CheckOutRequest, VisitCreateRequest, VisitUpdateRequest};
pub use user::{Actor, Role, StaffMember};
pub use visit::{Visit, VisitOutcome, VisitPriority, VisitStatus, VisitType, Vitals};
