// lib/src/lib.rs

//! Visit scheduling and workflow engine: validation, conflict detection,
//! lifecycle transitions and the audit trail behind the clinic's visit API.

pub mod audit;
pub mod clock;
pub mod config;
pub mod directory;
pub mod errors;
pub mod locks;
pub mod scheduling;
pub mod service;
pub mod storage_engine;
pub mod workflow;

pub use crate::audit::AuditLogger;
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{SchedulingConfig, StorageConfig, StorageEngineType};
pub use crate::directory::{Directory, DirectorySeed, InMemoryDirectory};
pub use crate::errors::StoreError;
pub use crate::service::{
    Availability, MutationOutcome, PageLimits, VisitDetails, VisitPage, VisitQuery, VisitService,
};
pub use crate::storage_engine::{create_stores, open_sled_db, AuditStore, Stores, VisitStore};
pub use crate::workflow::{WorkflowCapabilities, WorkflowError};

pub use models::errors::{FieldError, VisitError, VisitResult};
