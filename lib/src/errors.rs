// lib/src/errors.rs

use log::error;
use thiserror::Error;

use models::errors::VisitError;

/// Failures raised by the visit and audit stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("Serialization/Deserialization error: {0}")]
    Serialization(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Already Exists: {0}")]
    AlreadyExists(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Storage detail is logged here and never forwarded to callers.
impl From<StoreError> for VisitError {
    fn from(err: StoreError) -> Self {
        error!("Storage failure: {}", err);
        VisitError::Internal("internal storage failure".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_hide_storage_detail_from_callers() {
        let err: VisitError = StoreError::Database("disk /var/lib/clinic is full".into()).into();
        let msg = err.to_string();
        assert_eq!(msg, "internal storage failure");
        assert!(!msg.contains("/var/lib"));
    }
}
