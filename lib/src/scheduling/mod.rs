// lib/src/scheduling/mod.rs

pub mod availability;
pub mod conflict;
pub mod time_window;
pub mod validator;

pub use availability::{available_slots, Slot};
pub use conflict::{conflict_message, find_conflicts, Candidate};
pub use time_window::TimeWindow;
pub use validator::{check_placement, check_schedule, validate, ScheduleDraft, ValidatedRequest};
