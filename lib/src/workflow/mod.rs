// lib/src/workflow/mod.rs

pub mod engine;
pub mod vitals;

use thiserror::Error;

use models::errors::{FieldError, VisitError};
use models::medical::VisitStatus;

pub use engine::{
    allowed_transitions, can_transition, capabilities, check_in, check_out,
    ensure_reschedulable, transition, WorkflowCapabilities,
};

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("cannot transition visit from {from} to {to}")]
    InvalidTransition { from: VisitStatus, to: VisitStatus },
    #[error("cannot check in visit with status {0}")]
    CannotCheckIn(VisitStatus),
    #[error("cannot check out visit with status {0}")]
    CannotCheckOut(VisitStatus),
    #[error("cannot reschedule visit with status {0}")]
    CannotReschedule(VisitStatus),
    #[error("{}", describe(.0))]
    InvalidData(Vec<FieldError>),
}

impl From<WorkflowError> for VisitError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::InvalidData(errors) => VisitError::Validation(errors),
            WorkflowError::InvalidTransition { from, to } => VisitError::Workflow {
                from,
                to: Some(to),
                message,
            },
            WorkflowError::CannotCheckIn(from) => VisitError::Workflow {
                from,
                to: Some(VisitStatus::CheckedIn),
                message,
            },
            WorkflowError::CannotCheckOut(from) => VisitError::Workflow {
                from,
                to: Some(VisitStatus::Completed),
                message,
            },
            WorkflowError::CannotReschedule(from) => VisitError::Workflow {
                from,
                to: None,
                message,
            },
        }
    }
}
