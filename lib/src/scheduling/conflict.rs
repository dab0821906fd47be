// lib/src/scheduling/conflict.rs

use log::debug;
use uuid::Uuid;

use models::medical::{ConflictDimension, ScheduleConflict, Visit, VisitType};

use super::time_window::TimeWindow;

/// A proposed schedule to test against stored visits.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Set when rescheduling, so the visit never collides with itself.
    pub id: Option<Uuid>,
    pub visit_type: VisitType,
    pub patient_id: Option<&'a str>,
    pub doctor_id: Option<&'a str>,
    pub location: Option<&'a str>,
    pub window: TimeWindow,
}

impl<'a> Candidate<'a> {
    /// `None` when the visit has no schedule yet.
    pub fn from_visit(visit: &'a Visit) -> Option<Self> {
        let start = visit.scheduled_date_time?;
        let minutes = visit.duration?;
        Some(Candidate {
            id: Some(visit.id),
            visit_type: visit.visit_type,
            patient_id: Some(visit.patient_id.as_str()),
            doctor_id: visit.assigned_doctor_id.as_deref(),
            location: visit.location.as_deref(),
            window: TimeWindow::new(start, minutes),
        })
    }

    /// Emergency candidates see their conflicts but are never blocked by them.
    pub fn is_blocked_by(&self, conflicts: &[ScheduleConflict]) -> bool {
        !conflicts.is_empty() && !self.visit_type.is_emergency()
    }
}

fn same_id(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn same_location(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if !a.trim().is_empty() && a.trim().eq_ignore_ascii_case(b.trim()))
}

/// Every (existing visit, dimension) pair whose window overlaps the candidate.
/// Cancelled, deleted and unscheduled visits are ignored.
pub fn find_conflicts(candidate: &Candidate<'_>, existing: &[Visit]) -> Vec<ScheduleConflict> {
    let mut conflicts = Vec::new();

    for visit in existing {
        if Some(visit.id) == candidate.id || !visit.holds_slot() {
            continue;
        }
        let (Some(start), Some(minutes)) = (visit.scheduled_date_time, visit.duration) else {
            continue;
        };
        if !candidate.window.overlaps(&TimeWindow::new(start, minutes)) {
            continue;
        }

        let dimensions = [
            (
                ConflictDimension::Doctor,
                same_id(candidate.doctor_id, visit.assigned_doctor_id.as_deref()),
            ),
            (
                ConflictDimension::Location,
                same_location(candidate.location, visit.location.as_deref()),
            ),
            (
                ConflictDimension::Patient,
                same_id(candidate.patient_id, Some(visit.patient_id.as_str())),
            ),
        ];
        for (dimension, collides) in dimensions {
            if collides {
                conflicts.push(ScheduleConflict {
                    conflicting_visit_id: visit.id,
                    scheduled_date_time: start,
                    duration: minutes,
                    location: visit.location.clone(),
                    doctor_id: visit.assigned_doctor_id.clone(),
                    dimension,
                });
            }
        }
    }

    conflicts.sort_by(|a, b| {
        a.scheduled_date_time
            .cmp(&b.scheduled_date_time)
            .then(a.conflicting_visit_id.cmp(&b.conflicting_visit_id))
            .then(a.dimension.cmp(&b.dimension))
    });
    if !conflicts.is_empty() {
        debug!(
            "Candidate {:?} collides {} time(s) in window {:?}",
            candidate.id,
            conflicts.len(),
            candidate.window
        );
    }
    conflicts
}

/// Human-readable summary naming each colliding dimension once.
pub fn conflict_message(conflicts: &[ScheduleConflict]) -> String {
    let mut dimensions: Vec<ConflictDimension> = conflicts.iter().map(|c| c.dimension).collect();
    dimensions.sort();
    dimensions.dedup();
    let mut visits: Vec<Uuid> = conflicts.iter().map(|c| c.conflicting_visit_id).collect();
    visits.sort();
    visits.dedup();
    format!(
        "scheduling conflict on {} with {} existing visit(s)",
        dimensions
            .iter()
            .map(ConflictDimension::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        visits.len()
    )
}
