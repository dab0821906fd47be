// lib/src/config/config_defaults.rs

use std::path::PathBuf;

use chrono::NaiveTime;

use crate::config::StorageEngineType;

pub const DEFAULT_CONFIG_FILE: &str = "clinic_config.yaml";
pub const DEFAULT_DATA_DIRECTORY: &str = "./clinic_data";
pub const ENV_PREFIX: &str = "CLINIC";
pub const ENV_SEPARATOR: &str = "__";

pub fn default_working_hours_start() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}
pub fn default_working_hours_end() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}
pub fn default_min_duration_minutes() -> u32 { 10 }
pub fn default_max_duration_minutes() -> u32 { 240 }
pub fn default_duration_minutes() -> u32 { 30 }
pub fn default_allow_weekends() -> bool { false }
pub fn default_utc_offset_minutes() -> i32 { 0 }
pub fn default_slot_step_minutes() -> u32 { 30 }

pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Sled }
pub fn default_data_directory() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIRECTORY)
}
