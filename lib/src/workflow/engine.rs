// lib/src/workflow/engine.rs

//! Visit lifecycle state machine. `allowed_transitions` is the single source
//! of truth for generic status changes; check-in and check-out are compound
//! verbs with their own entry states.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use models::errors::FieldError;
use models::medical::{CheckInRequest, CheckOutRequest, Visit, VisitOutcome, VisitStatus};

use super::vitals::{merge_vitals, validate_vitals};
use super::WorkflowError;
use crate::scheduling::validator::{non_blank, parse_field};

pub fn allowed_transitions(from: VisitStatus) -> &'static [VisitStatus] {
    use VisitStatus::*;
    match from {
        Pending => &[Scheduled, InProgress, Cancelled],
        Scheduled => &[CheckedIn, Cancelled, NoShow, Rescheduled],
        CheckedIn => &[InProgress, Cancelled],
        InProgress => &[Completed, Cancelled],
        Rescheduled => &[Scheduled],
        Completed | Cancelled | NoShow => &[],
    }
}

pub fn can_transition(from: VisitStatus, to: VisitStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Generic status change. Entering `checked_in` or `completed` this way stamps
/// the matching timestamp if it is still unset.
pub fn transition(
    visit: &Visit,
    to: VisitStatus,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<Visit, WorkflowError> {
    if !can_transition(visit.status, to) {
        warn!("Rejected transition {} -> {} for visit {}", visit.status, to, visit.id);
        return Err(WorkflowError::InvalidTransition {
            from: visit.status,
            to,
        });
    }

    let mut next = visit.clone();
    next.status = to;
    match to {
        VisitStatus::CheckedIn if next.check_in_date_time.is_none() => {
            next.check_in_date_time = Some(now.max(next.created_at));
        }
        VisitStatus::Completed if next.check_out_date_time.is_none() => {
            next.check_out_date_time = Some(checkout_instant(&next, now));
        }
        _ => {}
    }
    next.touch(actor_id, now);
    debug!("Visit {} moved {} -> {}", visit.id, visit.status, to);
    Ok(next)
}

pub fn check_in(
    visit: &Visit,
    data: &CheckInRequest,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<Visit, WorkflowError> {
    if !matches!(visit.status, VisitStatus::Pending | VisitStatus::Scheduled) {
        return Err(WorkflowError::CannotCheckIn(visit.status));
    }
    if let Some(vitals) = &data.vitals {
        let errors = validate_vitals(vitals);
        if !errors.is_empty() {
            return Err(WorkflowError::InvalidData(errors));
        }
    }

    let mut next = visit.clone();
    next.status = VisitStatus::CheckedIn;
    if next.check_in_date_time.is_none() {
        next.check_in_date_time = Some(now.max(next.created_at));
    }
    if let Some(vitals) = &data.vitals {
        next.vitals = Some(merge_vitals(next.vitals.as_ref(), vitals));
    }
    next.notes = append_notes(next.notes.take(), data.notes.as_deref());
    next.touch(actor_id, now);
    Ok(next)
}

pub fn check_out(
    visit: &Visit,
    data: &CheckOutRequest,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<Visit, WorkflowError> {
    if !matches!(visit.status, VisitStatus::CheckedIn | VisitStatus::InProgress) {
        return Err(WorkflowError::CannotCheckOut(visit.status));
    }

    let mut errors = Vec::new();
    let outcome = match non_blank(data.outcome.as_deref()) {
        Some(raw) => match parse_field::<VisitOutcome>("outcome", &raw) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                errors.push(e);
                None
            }
        },
        None => {
            errors.push(FieldError::new("outcome", "outcome is required"));
            None
        }
    };
    if data.follow_up_required.is_none() {
        errors.push(FieldError::new("followUpRequired", "followUpRequired is required"));
    }
    if data.follow_up_required == Some(true) {
        if let Some(date) = data.follow_up_date {
            if date <= now {
                errors.push(FieldError::new(
                    "followUpDate",
                    "follow-up date must be in the future",
                ));
            }
        }
    }
    let (Some(outcome), true) = (outcome, errors.is_empty()) else {
        return Err(WorkflowError::InvalidData(errors));
    };

    let mut next = visit.clone();
    next.status = VisitStatus::Completed;
    if next.check_out_date_time.is_none() {
        next.check_out_date_time = Some(checkout_instant(&next, now));
    }
    next.outcome = Some(outcome);
    next.follow_up_required = data.follow_up_required;
    next.follow_up_date = if data.follow_up_required == Some(true) {
        data.follow_up_date
    } else {
        None
    };
    next.discharge_instructions = non_blank(data.discharge_instructions.as_deref());
    next.notes = append_notes(next.notes.take(), data.notes.as_deref());
    next.touch(actor_id, now);
    Ok(next)
}

/// Schedule changes are only allowed before the visit has started.
pub fn ensure_reschedulable(status: VisitStatus) -> Result<(), WorkflowError> {
    match status {
        VisitStatus::Pending | VisitStatus::Scheduled | VisitStatus::Rescheduled => Ok(()),
        other => Err(WorkflowError::CannotReschedule(other)),
    }
}

fn checkout_instant(visit: &Visit, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = visit.check_in_date_time.unwrap_or(visit.created_at);
    now.max(floor)
}

fn append_notes(existing: Option<String>, extra: Option<&str>) -> Option<String> {
    match (existing, non_blank(extra)) {
        (Some(old), Some(new)) => Some(format!("{}\n{}", old, new)),
        (old, new) => new.or(old),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCapabilities {
    pub current_status: VisitStatus,
    pub allowed_transitions: Vec<VisitStatus>,
    pub can_check_in: bool,
    pub can_check_out: bool,
    pub can_cancel: bool,
    pub can_reschedule: bool,
    pub can_assign: bool,
    pub errors: Vec<String>,
}

/// What a caller may do next with this visit.
pub fn capabilities(visit: &Visit) -> WorkflowCapabilities {
    let status = visit.status;
    let mut errors = Vec::new();
    if visit.is_deleted() {
        errors.push("visit has been deleted".to_string());
    }
    if status.is_terminal() {
        errors.push(format!("visit is {} and cannot change status", status));
    }
    let open = !visit.is_deleted();

    WorkflowCapabilities {
        current_status: status,
        allowed_transitions: if open { allowed_transitions(status).to_vec() } else { Vec::new() },
        can_check_in: open && matches!(status, VisitStatus::Pending | VisitStatus::Scheduled),
        can_check_out: open && matches!(status, VisitStatus::CheckedIn | VisitStatus::InProgress),
        can_cancel: open && can_transition(status, VisitStatus::Cancelled),
        can_reschedule: open && ensure_reschedulable(status).is_ok(),
        can_assign: open && !status.is_terminal(),
        errors,
    }
}
