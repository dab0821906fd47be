// lib/src/storage_engine/sled_storage.rs

use std::path::Path;

use async_trait::async_trait;
use log::{error, info};
use sled::{Db, Tree};
use uuid::Uuid;

use models::medical::{AuditLogEntry, Visit};

use super::storage_engine::{AuditStore, VisitStore};
use super::storage_utils::{
    audit_key, deserialize_audit_entry, deserialize_visit, serialize_audit_entry,
    serialize_visit, visit_key,
};
use crate::errors::{Result, StoreError};

pub const VISITS_TREE: &str = "visits";
pub const AUDIT_TREE: &str = "audit_log";

/// Opens (creating if needed) the sled database under `path`.
pub fn open_sled_db<P: AsRef<Path>>(path: P) -> Result<Db> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|e| {
        error!("Failed to create database directory at {:?}: {}", path, e);
        StoreError::Database(format!("Failed to create database directory at {:?}: {}", path, e))
    })?;
    let db = sled::open(path)?;
    info!("Opened sled database at {:?}", path);
    Ok(db)
}

#[derive(Debug, Clone)]
pub struct SledVisitStore {
    tree: Tree,
}

impl SledVisitStore {
    pub fn new(db: &Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(VISITS_TREE)?,
        })
    }
}

#[async_trait]
impl VisitStore for SledVisitStore {
    async fn insert(&self, visit: &Visit) -> Result<()> {
        let bytes = serialize_visit(visit)?;
        let swapped = self
            .tree
            .compare_and_swap(visit_key(&visit.id), None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() {
            return Err(StoreError::AlreadyExists(format!("visit {}", visit.id)));
        }
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn update(&self, visit: &Visit) -> Result<()> {
        let key = visit_key(&visit.id);
        if !self.tree.contains_key(key)? {
            return Err(StoreError::NotFound(format!("visit {}", visit.id)));
        }
        self.tree.insert(key, serialize_visit(visit)?)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Visit>> {
        match self.tree.get(visit_key(id))? {
            Some(bytes) => Ok(Some(deserialize_visit(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn discard(&self, id: &Uuid) -> Result<()> {
        self.tree.remove(visit_key(id))?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Visit>> {
        let mut visits = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            visits.push(deserialize_visit(&bytes)?);
        }
        Ok(visits)
    }

    fn get_type(&self) -> &'static str {
        "Sled"
    }
}

#[derive(Debug, Clone)]
pub struct SledAuditStore {
    tree: Tree,
}

impl SledAuditStore {
    pub fn new(db: &Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(AUDIT_TREE)?,
        })
    }
}

#[async_trait]
impl AuditStore for SledAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        let bytes = serialize_audit_entry(entry)?;
        let swapped = self.tree.compare_and_swap(
            audit_key(entry.sequence),
            None as Option<&[u8]>,
            Some(bytes),
        )?;
        if swapped.is_err() {
            return Err(StoreError::AlreadyExists(format!(
                "audit sequence {}",
                entry.sequence
            )));
        }
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            entries.push(deserialize_audit_entry(&bytes)?);
        }
        Ok(entries)
    }

    async fn last(&self) -> Result<Option<AuditLogEntry>> {
        match self.tree.last()? {
            Some((_, bytes)) => Ok(Some(deserialize_audit_entry(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_type(&self) -> &'static str {
        "Sled"
    }
}
