// models/src/medical/visit.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of clinical encounter. `Emergency` carries scheduling exemptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    Initial,
    FollowUp,
    Emergency,
    Routine,
    Specialist,
    Surgery,
    Therapy,
    Consultation,
}

impl VisitType {
    pub const ALL: [VisitType; 8] = [
        VisitType::Initial,
        VisitType::FollowUp,
        VisitType::Emergency,
        VisitType::Routine,
        VisitType::Specialist,
        VisitType::Surgery,
        VisitType::Therapy,
        VisitType::Consultation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Initial => "initial",
            VisitType::FollowUp => "follow_up",
            VisitType::Emergency => "emergency",
            VisitType::Routine => "routine",
            VisitType::Specialist => "specialist",
            VisitType::Surgery => "surgery",
            VisitType::Therapy => "therapy",
            VisitType::Consultation => "consultation",
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, VisitType::Emergency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitPriority {
    Low,
    Medium,
    High,
    Urgent,
    Emergency,
}

impl VisitPriority {
    pub const ALL: [VisitPriority; 5] = [
        VisitPriority::Low,
        VisitPriority::Medium,
        VisitPriority::High,
        VisitPriority::Urgent,
        VisitPriority::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitPriority::Low => "low",
            VisitPriority::Medium => "medium",
            VisitPriority::High => "high",
            VisitPriority::Urgent => "urgent",
            VisitPriority::Emergency => "emergency",
        }
    }

    /// Severity rank used when sorting by priority; higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            VisitPriority::Low => 0,
            VisitPriority::Medium => 1,
            VisitPriority::High => 2,
            VisitPriority::Urgent => 3,
            VisitPriority::Emergency => 4,
        }
    }
}

/// Lifecycle state of a visit. Transitions are owned by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Pending,
    Scheduled,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl VisitStatus {
    pub const ALL: [VisitStatus; 8] = [
        VisitStatus::Pending,
        VisitStatus::Scheduled,
        VisitStatus::CheckedIn,
        VisitStatus::InProgress,
        VisitStatus::Completed,
        VisitStatus::Cancelled,
        VisitStatus::NoShow,
        VisitStatus::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Pending => "pending",
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::CheckedIn => "checked_in",
            VisitStatus::InProgress => "in_progress",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
            VisitStatus::NoShow => "no_show",
            VisitStatus::Rescheduled => "rescheduled",
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VisitStatus::Completed | VisitStatus::Cancelled | VisitStatus::NoShow
        )
    }
}

/// Disposition recorded at check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitOutcome {
    Discharged,
    Admitted,
    Transferred,
    Referred,
    Deceased,
    Other,
}

impl VisitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitOutcome::Discharged => "discharged",
            VisitOutcome::Admitted => "admitted",
            VisitOutcome::Transferred => "transferred",
            VisitOutcome::Referred => "referred",
            VisitOutcome::Deceased => "deceased",
            VisitOutcome::Other => "other",
        }
    }
}

macro_rules! impl_wire_name {
    ($ty:ident, $all:expr, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $all.iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| format!("invalid {}: {}", $what, s))
            }
        }
    };
}

impl_wire_name!(VisitType, VisitType::ALL, "visit type");
impl_wire_name!(VisitPriority, VisitPriority::ALL, "priority");
impl_wire_name!(VisitStatus, VisitStatus::ALL, "status");
impl_wire_name!(
    VisitOutcome,
    [
        VisitOutcome::Discharged,
        VisitOutcome::Admitted,
        VisitOutcome::Transferred,
        VisitOutcome::Referred,
        VisitOutcome::Deceased,
        VisitOutcome::Other,
    ],
    "outcome"
);

/// Vital signs captured at check-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i32>,
    /// Degrees Celsius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Centimetres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// A single scheduled or walk-in clinical encounter.
///
/// `created_*`, `updated_*`, `deleted_at` and the check-in/out stamps are
/// system-managed. `status` only changes through the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_doctor_id: Option<String>,
    pub visit_type: VisitType,
    pub priority: VisitPriority,
    pub status: VisitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date_time: Option<DateTime<Utc>>,
    /// Minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date_time: Option<DateTime<Utc>>,
    pub reason_for_visit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VisitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharge_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Visit {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this visit still occupies its time window for conflict purposes.
    pub fn holds_slot(&self) -> bool {
        !self.is_deleted() && self.status != VisitStatus::Cancelled
    }

    /// Refreshes `updated_at`/`updated_by`. `updated_at` never moves backwards
    /// and always advances, even when two mutations share a clock reading.
    pub fn touch(&mut self, actor_id: &str, now: DateTime<Utc>) {
        let floor = self.updated_at + Duration::milliseconds(1);
        self.updated_at = if now > floor { now } else { floor };
        self.updated_by = Some(actor_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Visit {
        let t = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        Visit {
            id: Uuid::new_v4(),
            patient_id: "p-1".into(),
            assigned_doctor_id: Some("d-1".into()),
            visit_type: VisitType::FollowUp,
            priority: VisitPriority::Medium,
            status: VisitStatus::Pending,
            scheduled_date_time: Some(t),
            duration: Some(30),
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
            created_at: t,
            updated_at: t,
            created_by: "u-1".into(),
            updated_by: None,
            deleted_at: None,
        }
    }

    #[test]
    fn serializes_with_camel_case_and_snake_case_enums() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["visitType"], "follow_up");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["reasonForVisit"], "checkup");
        assert!(json.get("deletedAt").is_none());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("checked_in".parse::<VisitStatus>(), Ok(VisitStatus::CheckedIn));
        assert_eq!(" Emergency ".parse::<VisitType>(), Ok(VisitType::Emergency));
        assert!("invalid_priority".parse::<VisitPriority>().is_err());
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = VisitStatus::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![&VisitStatus::Completed, &VisitStatus::Cancelled, &VisitStatus::NoShow]
        );
    }

    #[test]
    fn touch_always_advances_updated_at() {
        let mut v = sample();
        let before = v.updated_at;
        v.touch("u-2", before);
        assert!(v.updated_at > before);
        assert_eq!(v.updated_by.as_deref(), Some("u-2"));
    }

    #[test]
    fn cancelled_and_deleted_visits_release_their_slot() {
        let mut v = sample();
        assert!(v.holds_slot());
        v.status = VisitStatus::Cancelled;
        assert!(!v.holds_slot());
        let mut d = sample();
        d.deleted_at = Some(d.created_at);
        assert!(!d.holds_slot());
    }
}
