// lib/src/scheduling/validator.rs

//! Stateless scheduling rules. Required-field failures short-circuit; business
//! rule failures are accumulated so a client sees every violation at once.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use log::debug;

use models::errors::FieldError;
use models::medical::{VisitCreateRequest, VisitPriority, VisitType};

use crate::config::SchedulingConfig;

/// A create request that passed every rule, with enums parsed and the
/// default duration filled in for scheduled visits.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub patient_id: String,
    pub visit_type: VisitType,
    pub priority: VisitPriority,
    pub reason_for_visit: String,
    pub assigned_doctor_id: Option<String>,
    pub scheduled_date_time: Option<DateTime<Utc>>,
    pub duration: Option<u32>,
    pub location: Option<String>,
    pub department_id: Option<String>,
    pub notes: Option<String>,
}

/// The schedule-relevant slice of a visit, shared by create and reschedule.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleDraft<'a> {
    pub visit_type: VisitType,
    pub scheduled_date_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub location: Option<&'a str>,
    pub assigned_doctor_id: Option<&'a str>,
}

pub fn validate(
    request: &VisitCreateRequest,
    now: DateTime<Utc>,
    config: &SchedulingConfig,
) -> Result<ValidatedRequest, Vec<FieldError>> {
    let mut required = Vec::new();

    let patient_id = required_text(&mut required, "patientId", request.patient_id.as_deref());
    let reason = required_text(
        &mut required,
        "reasonForVisit",
        request.reason_for_visit.as_deref(),
    );
    let visit_type =
        required_text(&mut required, "visitType", request.visit_type.as_deref())
            .and_then(|raw| push_err(&mut required, parse_field::<VisitType>("visitType", &raw)));
    let priority = required_text(&mut required, "priority", request.priority.as_deref())
        .and_then(|raw| push_err(&mut required, parse_field::<VisitPriority>("priority", &raw)));

    let (Some(patient_id), Some(reason), Some(visit_type), Some(priority)) =
        (patient_id, reason, visit_type, priority)
    else {
        debug!("Create request rejected on required fields: {:?}", required);
        return Err(required);
    };

    let location = non_blank(request.location.as_deref());
    let assigned_doctor_id = non_blank(request.assigned_doctor_id.as_deref());

    let errors = check_schedule(
        &ScheduleDraft {
            visit_type,
            scheduled_date_time: request.scheduled_date_time,
            duration: request.duration,
            location: location.as_deref(),
            assigned_doctor_id: assigned_doctor_id.as_deref(),
        },
        now,
        config,
    );
    if !errors.is_empty() {
        debug!("Create request rejected on business rules: {:?}", errors);
        return Err(errors);
    }

    // Range-checked by check_schedule.
    let duration = match (request.duration, request.scheduled_date_time) {
        (Some(minutes), _) => u32::try_from(minutes).ok(),
        (None, Some(_)) => Some(config.default_duration_minutes),
        (None, None) => None,
    };

    Ok(ValidatedRequest {
        patient_id,
        visit_type,
        priority,
        reason_for_visit: reason,
        assigned_doctor_id,
        scheduled_date_time: request.scheduled_date_time,
        duration,
        location,
        department_id: non_blank(request.department_id.as_deref()),
        notes: non_blank(request.notes.as_deref()),
    })
}

/// Business rules over a (possibly merged) schedule. Emergency visits skip the
/// working-hours and weekend checks but not the others.
pub fn check_schedule(
    draft: &ScheduleDraft<'_>,
    now: DateTime<Utc>,
    config: &SchedulingConfig,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let duration_ok = match draft.duration {
        Some(minutes) => {
            let ok = minutes >= i64::from(config.min_duration_minutes)
                && minutes <= i64::from(config.max_duration_minutes);
            if !ok {
                errors.push(FieldError::new(
                    "duration",
                    format!(
                        "duration must be between {} and {} minutes",
                        config.min_duration_minutes, config.max_duration_minutes
                    ),
                ));
            }
            ok
        }
        None => true,
    };

    let Some(start) = draft.scheduled_date_time else {
        return errors;
    };

    if start <= now {
        errors.push(FieldError::new(
            "scheduledDateTime",
            "scheduled date and time cannot be in the past",
        ));
    }

    let minutes = match draft.duration {
        Some(d) if duration_ok => d,
        _ => i64::from(config.default_duration_minutes),
    };
    errors.extend(check_placement(draft, start, minutes, config));
    errors
}

/// The rules that depend only on where a slot falls, not on when it is
/// checked. Re-run on their own when a visit loses its emergency exemption.
pub fn check_placement(
    draft: &ScheduleDraft<'_>,
    start: DateTime<Utc>,
    minutes: i64,
    config: &SchedulingConfig,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !draft.visit_type.is_emergency() {
        let local = start.with_timezone(&config.offset());

        if !config.allow_weekends && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            errors.push(FieldError::new(
                "scheduledDateTime",
                "visits cannot be scheduled on a weekend",
            ));
        }

        let end = local + Duration::minutes(minutes);
        let within_hours = local.time() >= config.working_hours_start
            && local.time() < config.working_hours_end
            && end.date_naive() == local.date_naive()
            && end.time() <= config.working_hours_end;
        if !within_hours {
            errors.push(FieldError::new(
                "scheduledDateTime",
                format!(
                    "visit must be scheduled within working hours ({} - {})",
                    config.working_hours_start.format("%H:%M"),
                    config.working_hours_end.format("%H:%M")
                ),
            ));
            if draft.assigned_doctor_id.is_some() {
                errors.push(FieldError::new(
                    "assignedDoctorId",
                    "doctor is not available outside working hours",
                ));
            }
        }
    }

    if draft.location.is_none_or(|l| l.trim().is_empty()) {
        errors.push(FieldError::new(
            "location",
            "location is required when a visit is scheduled",
        ));
    }

    errors
}

pub fn parse_field<T>(field: &str, raw: &str) -> Result<T, FieldError>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|msg| FieldError::new(field, msg))
}

pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_text(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) -> Option<String> {
    let value = non_blank(value);
    if value.is_none() {
        errors.push(FieldError::new(field, format!("{} is required", field)));
    }
    value
}

fn push_err<T>(errors: &mut Vec<FieldError>, result: Result<T, FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}
