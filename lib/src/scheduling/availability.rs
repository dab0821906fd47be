// lib/src/scheduling/availability.rs

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::Serialize;

use models::medical::{Visit, VisitType};

use super::conflict::{find_conflicts, Candidate};
use super::time_window::TimeWindow;
use crate::config::SchedulingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Free slots of `duration` minutes on `date` (clinic-local), stepping through
/// the working day. A slot is free when it is in the future and collides with
/// nothing on the given doctor or location.
pub fn available_slots(
    date: NaiveDate,
    duration: u32,
    doctor_id: Option<&str>,
    location: Option<&str>,
    existing: &[Visit],
    now: DateTime<Utc>,
    config: &SchedulingConfig,
) -> Vec<Slot> {
    if !config.allow_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return Vec::new();
    }

    let offset = config.offset();
    let open = date.and_time(config.working_hours_start);
    let close = date.and_time(config.working_hours_end);
    let length = Duration::minutes(i64::from(duration));
    let step = Duration::minutes(i64::from(config.slot_step_minutes.max(1)));

    let mut slots = Vec::new();
    let mut cursor = open;
    while cursor + length <= close {
        if let Some(local_start) = offset.from_local_datetime(&cursor).single() {
            let start = local_start.with_timezone(&Utc);
            let candidate = Candidate {
                id: None,
                visit_type: VisitType::Routine,
                patient_id: None,
                doctor_id,
                location,
                window: TimeWindow::new(start, duration),
            };
            if start > now && find_conflicts(&candidate, existing).is_empty() {
                slots.push(Slot {
                    start,
                    end: start + length,
                });
            }
        }
        cursor += step;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::medical::{VisitPriority, VisitStatus};
    use uuid::Uuid;

    fn booked(start: DateTime<Utc>) -> Visit {
        Visit {
            id: Uuid::new_v4(),
            patient_id: "p-1".into(),
            assigned_doctor_id: Some("d-1".into()),
            visit_type: VisitType::Routine,
            priority: VisitPriority::Medium,
            status: VisitStatus::Scheduled,
            scheduled_date_time: Some(start),
            duration: Some(60),
            location: Some("Room 1".into()),
            department_id: None,
            check_in_date_time: None,
            check_out_date_time: None,
            reason_for_visit: "checkup".into(),
            notes: None,
            vitals: None,
            outcome: None,
            follow_up_required: None,
            follow_up_date: None,
            discharge_instructions: None,
            created_at: start,
            updated_at: start,
            created_by: "u-1".into(),
            updated_by: None,
            deleted_at: None,
        }
    }

    #[test]
    fn removes_booked_and_past_slots() {
        let config = SchedulingConfig::default();
        let date = NaiveDate::from_ymd_opt(2030, 1, 8).unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 8, 9, 0, 0).unwrap();
        let existing = vec![booked(Utc.with_ymd_and_hms(2030, 1, 8, 10, 0, 0).unwrap())];

        let slots = available_slots(date, 30, Some("d-1"), None, &existing, now, &config);
        let starts: Vec<String> = slots.iter().map(|s| s.start.format("%H:%M").to_string()).collect();
        assert_eq!(starts.first().map(String::as_str), Some("09:30"));
        assert!(!starts.contains(&"10:00".to_string()));
        assert!(!starts.contains(&"10:30".to_string()));
        assert!(starts.contains(&"11:00".to_string()));
        assert_eq!(starts.last().map(String::as_str), Some("17:30"));
    }

    #[test]
    fn other_doctors_are_unaffected() {
        let config = SchedulingConfig::default();
        let date = NaiveDate::from_ymd_opt(2030, 1, 8).unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let existing = vec![booked(Utc.with_ymd_and_hms(2030, 1, 8, 10, 0, 0).unwrap())];
        let slots = available_slots(date, 30, Some("d-2"), None, &existing, now, &config);
        assert_eq!(slots.len(), 20);
    }

    #[test]
    fn weekends_have_no_slots() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 12).unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let slots = available_slots(date, 30, None, Some("Room 1"), &[], now, &SchedulingConfig::default());
        assert!(slots.is_empty());
    }
}
