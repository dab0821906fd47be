// lib/src/storage_engine/storage_utils.rs

use models::medical::{AuditLogEntry, Visit};
use uuid::Uuid;

use crate::errors::Result;

/// MessagePack with field names, so records survive field reordering.
pub fn serialize_visit(visit: &Visit) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(visit)?)
}

pub fn deserialize_visit(bytes: &[u8]) -> Result<Visit> {
    Ok(rmp_serde::from_slice(bytes)?)
}

pub fn serialize_audit_entry(entry: &AuditLogEntry) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(entry)?)
}

pub fn deserialize_audit_entry(bytes: &[u8]) -> Result<AuditLogEntry> {
    Ok(rmp_serde::from_slice(bytes)?)
}

pub fn visit_key(id: &Uuid) -> [u8; 16] {
    *id.as_bytes()
}

/// Big-endian so that sled's lexicographic order is append order.
pub fn audit_key(sequence: u64) -> [u8; 8] {
    sequence.to_be_bytes()
}
