// lib/src/config/config_structs.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::config::config_defaults::*;
use crate::config::config_serializers::{hhmm, storage_engine_type_serde};

/// Business rules applied by the scheduling validator and the availability grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(with = "hhmm", default = "default_working_hours_start")]
    pub working_hours_start: NaiveTime,
    #[serde(with = "hhmm", default = "default_working_hours_end")]
    pub working_hours_end: NaiveTime,
    #[serde(default = "default_min_duration_minutes")]
    pub min_duration_minutes: u32,
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u32,
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
    #[serde(default = "default_allow_weekends")]
    pub allow_weekends: bool,
    /// Clinic-local offset from UTC; hours, weekends and day buckets are
    /// evaluated in this offset.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_slot_step_minutes")]
    pub slot_step_minutes: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        SchedulingConfig {
            working_hours_start: default_working_hours_start(),
            working_hours_end: default_working_hours_end(),
            min_duration_minutes: default_min_duration_minutes(),
            max_duration_minutes: default_max_duration_minutes(),
            default_duration_minutes: default_duration_minutes(),
            allow_weekends: default_allow_weekends(),
            utc_offset_minutes: default_utc_offset_minutes(),
            slot_step_minutes: default_slot_step_minutes(),
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.working_hours_start >= self.working_hours_end {
            return Err(format!(
                "working_hours_start ({}) must be before working_hours_end ({})",
                self.working_hours_start.format("%H:%M"),
                self.working_hours_end.format("%H:%M")
            ));
        }
        if self.min_duration_minutes == 0 || self.min_duration_minutes > self.max_duration_minutes {
            return Err(format!(
                "invalid duration bounds [{}, {}]",
                self.min_duration_minutes, self.max_duration_minutes
            ));
        }
        if self.default_duration_minutes < self.min_duration_minutes
            || self.default_duration_minutes > self.max_duration_minutes
        {
            return Err(format!(
                "default_duration_minutes ({}) outside [{}, {}]",
                self.default_duration_minutes, self.min_duration_minutes, self.max_duration_minutes
            ));
        }
        if self.slot_step_minutes == 0 {
            return Err("slot_step_minutes must be positive".to_string());
        }
        if FixedOffset::east_opt(self.utc_offset_minutes * 60).is_none() {
            return Err(format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes));
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngineType {
    Sled,
    InMemory,
}

impl StorageEngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageEngineType::Sled => "sled",
            StorageEngineType::InMemory => "in_memory",
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageEngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sled" => Ok(StorageEngineType::Sled),
            "in_memory" | "inmemory" | "memory" => Ok(StorageEngineType::InMemory),
            other => Err(format!("unknown storage engine type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(with = "storage_engine_type_serde", default = "default_storage_engine_type")]
    pub engine_type: StorageEngineType,
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            engine_type: default_storage_engine_type(),
            data_directory: default_data_directory(),
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        StorageConfig {
            engine_type: StorageEngineType::InMemory,
            ..StorageConfig::default()
        }
    }
}
