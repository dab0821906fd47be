// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use uuid::Uuid;

use models::medical::{AuditLogEntry, Visit};

use crate::errors::Result;

/// Persistence for visit records. Mutation is last-write-wins; callers hold
/// the relevant dimension locks before writing.
#[async_trait]
pub trait VisitStore: Send + Sync + 'static {
    /// Stores a new visit. Fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, visit: &Visit) -> Result<()>;

    /// Replaces an existing visit. Fails with `NotFound` if the id is unknown.
    async fn update(&self, visit: &Visit) -> Result<()>;

    async fn get(&self, id: &Uuid) -> Result<Option<Visit>>;

    /// Physically removes a visit. Only used to roll back an insert whose
    /// unit of work did not commit; soft deletion goes through `update`.
    async fn discard(&self, id: &Uuid) -> Result<()>;

    /// Every stored visit, soft-deleted ones included.
    async fn all(&self) -> Result<Vec<Visit>>;

    /// Visits that still occupy their time slot.
    async fn active(&self) -> Result<Vec<Visit>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(Visit::holds_slot)
            .collect())
    }

    fn get_type(&self) -> &'static str;
}

/// Append-only audit persistence. There is deliberately no update or delete.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    /// Appends an entry. Fails with `AlreadyExists` if its sequence is taken.
    async fn append(&self, entry: &AuditLogEntry) -> Result<()>;

    /// All entries in append order.
    async fn entries(&self) -> Result<Vec<AuditLogEntry>>;

    async fn last(&self) -> Result<Option<AuditLogEntry>>;

    fn get_type(&self) -> &'static str;
}
