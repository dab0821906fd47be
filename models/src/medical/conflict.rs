// models/src/medical/conflict.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The uniqueness axis on which two visits collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDimension {
    Doctor,
    Location,
    Patient,
}

impl ConflictDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictDimension::Doctor => "doctor",
            ConflictDimension::Location => "location",
            ConflictDimension::Patient => "patient",
        }
    }
}

impl fmt::Display for ConflictDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (existing visit, dimension) collision. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub conflicting_visit_id: Uuid,
    pub scheduled_date_time: DateTime<Utc>,
    pub duration: u32,
    pub location: Option<String>,
    pub doctor_id: Option<String>,
    pub dimension: ConflictDimension,
}
