// lib/src/storage_engine/inmemory_storage.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::medical::{AuditLogEntry, Visit};

use super::storage_engine::{AuditStore, VisitStore};
use crate::errors::{Result, StoreError};

#[derive(Debug, Default, Clone)]
pub struct InMemoryVisitStore {
    visits: Arc<RwLock<HashMap<Uuid, Visit>>>,
}

impl InMemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitStore for InMemoryVisitStore {
    async fn insert(&self, visit: &Visit) -> Result<()> {
        let mut visits = self.visits.write().await;
        if visits.contains_key(&visit.id) {
            return Err(StoreError::AlreadyExists(format!("visit {}", visit.id)));
        }
        visits.insert(visit.id, visit.clone());
        Ok(())
    }

    async fn update(&self, visit: &Visit) -> Result<()> {
        let mut visits = self.visits.write().await;
        match visits.get_mut(&visit.id) {
            Some(slot) => {
                *slot = visit.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("visit {}", visit.id))),
        }
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Visit>> {
        let visits = self.visits.read().await;
        Ok(visits.get(id).cloned())
    }

    async fn discard(&self, id: &Uuid) -> Result<()> {
        let mut visits = self.visits.write().await;
        visits.remove(id);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Visit>> {
        let visits = self.visits.read().await;
        Ok(visits.values().cloned().collect())
    }

    fn get_type(&self) -> &'static str {
        "InMemory"
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditStore {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.last().is_some_and(|last| last.sequence >= entry.sequence) {
            return Err(StoreError::AlreadyExists(format!(
                "audit sequence {}",
                entry.sequence
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn last(&self) -> Result<Option<AuditLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.last().cloned())
    }

    fn get_type(&self) -> &'static str {
        "InMemory"
    }
}
