// models/src/lib.rs

//! Data types shared by the visit engine, the security layer and the REST API.
//!
//! Nothing in here performs I/O. The engine crate (`lib`) owns the behaviour;
//! this crate only fixes the shapes that cross crate and wire boundaries.

pub mod errors;
pub mod medical;

pub use errors::{FieldError, VisitError, VisitResult};
pub use medical::{
    Actor, AuditAction, AuditLogEntry, CheckInRequest, CheckOutRequest, ConflictDimension,
    DepartmentSummary, FieldChange, PatientSummary, Role, ScheduleConflict, StaffMember, Visit,
    VisitCreateRequest, VisitOutcome, VisitPriority, VisitStatus, VisitType, VisitUpdateRequest,
    Vitals,
};
