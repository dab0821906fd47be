// models/src/medical/requests.rs

//! Client payloads. Enum-valued fields arrive as raw strings so that an
//! unknown value is reported as a field error by the validator instead of a
//! generic body rejection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::visit::Vitals;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitCreateRequest {
    pub patient_id: Option<String>,
    pub visit_type: Option<String>,
    pub priority: Option<String>,
    pub reason_for_visit: Option<String>,
    pub assigned_doctor_id: Option<String>,
    pub scheduled_date_time: Option<DateTime<Utc>>,
    /// Signed so that negative input surfaces as a duration error.
    pub duration: Option<i64>,
    pub location: Option<String>,
    pub department_id: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. Only the fields listed here are updatable; anything else in
/// the body is ignored at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitUpdateRequest {
    pub visit_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub reason_for_visit: Option<String>,
    pub assigned_doctor_id: Option<String>,
    pub scheduled_date_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub location: Option<String>,
    pub department_id: Option<String>,
    pub notes: Option<String>,
}

impl VisitUpdateRequest {
    pub fn is_empty(&self) -> bool {
        *self == VisitUpdateRequest::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub notes: Option<String>,
    pub vitals: Option<Vitals>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub outcome: Option<String>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub discharge_instructions: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_ignores_fields_outside_the_allow_list() {
        let req: VisitUpdateRequest = serde_json::from_value(serde_json::json!({
            "reasonForVisit": "pain",
            "createdBy": "attacker",
            "id": "00000000-0000-0000-0000-000000000000"
        }))
        .unwrap();
        assert_eq!(req.reason_for_visit.as_deref(), Some("pain"));
        assert!(req.scheduled_date_time.is_none());
        assert!(!req.is_empty());
    }

    #[test]
    fn create_accepts_negative_duration_for_later_rejection() {
        let req: VisitCreateRequest =
            serde_json::from_value(serde_json::json!({ "duration": -30 })).unwrap();
        assert_eq!(req.duration, Some(-30));
    }
}
