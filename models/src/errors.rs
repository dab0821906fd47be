// models/src/errors.rs

use serde::{Deserialize, Serialize};
pub use thiserror::Error;

use crate::medical::{ScheduleConflict, VisitStatus};

/// A single rejected input field, shaped for client display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return "validation failed".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every failure a visit operation can report to its caller.
///
/// The REST layer maps each variant onto exactly one HTTP status; nothing
/// below the service boundary is allowed to escape as a panic.
#[derive(Debug, Error)]
pub enum VisitError {
    /// Malformed or out-of-policy input (400).
    #[error("{}", join_field_errors(.0))]
    Validation(Vec<FieldError>),
    /// Unknown visit, patient or doctor (404).
    #[error("{0}")]
    NotFound(String),
    /// Scheduling overlap (409); carries every colliding visit.
    #[error("{message}")]
    Conflict {
        message: String,
        conflicts: Vec<ScheduleConflict>,
    },
    /// Illegal state transition (400).
    #[error("{message}")]
    Workflow {
        from: VisitStatus,
        to: Option<VisitStatus>,
        message: String,
    },
    /// Role or ownership failure (403).
    #[error("{0}")]
    Forbidden(String),
    /// Persistence or runtime failure (500). The message is already sanitized.
    #[error("{0}")]
    Internal(String),
}

impl VisitError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        VisitError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            VisitError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn conflicts(&self) -> Option<&[ScheduleConflict]> {
        match self {
            VisitError::Conflict { conflicts, .. } => Some(conflicts),
            _ => None,
        }
    }
}

pub type VisitResult<T> = Result<T, VisitError>;
