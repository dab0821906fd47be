// lib/src/storage_engine/mod.rs

pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;
pub mod storage_utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

pub use inmemory_storage::{InMemoryAuditStore, InMemoryVisitStore};
pub use sled_storage::{open_sled_db, SledAuditStore, SledVisitStore};
pub use storage_engine::{AuditStore, VisitStore};

use crate::config::{StorageConfig, StorageEngineType};

/// The pair of stores a visit service runs against.
#[derive(Clone)]
pub struct Stores {
    pub visits: Arc<dyn VisitStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Stores {
            visits: Arc::new(InMemoryVisitStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }
}

/// Creates visit and audit stores for the configured engine. Both sled stores
/// share one database so they live and die together.
pub fn create_stores(config: &StorageConfig) -> Result<Stores> {
    match config.engine_type {
        StorageEngineType::Sled => {
            let db = open_sled_db(&config.data_directory)
                .with_context(|| format!("opening sled database at {:?}", config.data_directory))?;
            let stores = Stores {
                visits: Arc::new(SledVisitStore::new(&db).context("opening visits tree")?),
                audit: Arc::new(SledAuditStore::new(&db).context("opening audit tree")?),
            };
            info!("Using sled storage at {:?}", config.data_directory);
            Ok(stores)
        }
        StorageEngineType::InMemory => {
            info!("Using in-memory storage; visits will not survive a restart");
            Ok(Stores::in_memory())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use chrono::{TimeZone, Utc};
    use models::medical::{
        AuditAction, AuditLogEntry, Visit, VisitPriority, VisitStatus, VisitType,
    };
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn visit() -> Visit {
        let t = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        Visit {
            id: Uuid::new_v4(),
            patient_id: "p-1".into(),
            assigned_doctor_id: Some("d-1".into()),
            visit_type: VisitType::Routine,
            priority: VisitPriority::Low,
            status: VisitStatus::Pending,
            scheduled_date_time: Some(t),
            duration: Some(30),
            location: Some("Room 1".into()),
            department_id: None,
            check_in_date_time: None,
            check_out_date_time: None,
            reason_for_visit: "checkup".into(),
            notes: None,
            vitals: None,
            outcome: None,
            follow_up_required: None,
            follow_up_date: None,
            discharge_instructions: None,
            created_at: t,
            updated_at: t,
            created_by: "u-1".into(),
            updated_by: None,
            deleted_at: None,
        }
    }

    fn entry(sequence: u64, visit_id: Uuid) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            sequence,
            visit_id,
            actor_id: "u-1".into(),
            actor_username: None,
            action: AuditAction::Create,
            changed_fields: BTreeMap::new(),
            timestamp: Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap(),
            actor_ip: None,
        }
    }

    async fn exercise_visit_store(store: &dyn VisitStore) {
        let mut v = visit();
        store.insert(&v).await.unwrap();
        assert!(matches!(store.insert(&v).await, Err(StoreError::AlreadyExists(_))));

        v.status = VisitStatus::Cancelled;
        store.update(&v).await.unwrap();
        assert_eq!(store.get(&v.id).await.unwrap().unwrap().status, VisitStatus::Cancelled);
        assert_eq!(store.all().await.unwrap().len(), 1);
        assert!(store.active().await.unwrap().is_empty());

        let ghost = visit();
        assert!(matches!(store.update(&ghost).await, Err(StoreError::NotFound(_))));

        store.discard(&v.id).await.unwrap();
        assert!(store.get(&v.id).await.unwrap().is_none());
    }

    async fn exercise_audit_store(store: &dyn AuditStore) {
        let id = Uuid::new_v4();
        store.append(&entry(1, id)).await.unwrap();
        store.append(&entry(2, id)).await.unwrap();
        assert!(matches!(store.append(&entry(2, id)).await, Err(StoreError::AlreadyExists(_))));
        let seqs: Vec<u64> = store.entries().await.unwrap().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(store.last().await.unwrap().map(|e| e.sequence), Some(2));
    }

    #[tokio::test]
    async fn in_memory_stores_behave() {
        let stores = Stores::in_memory();
        exercise_visit_store(stores.visits.as_ref()).await;
        exercise_audit_store(stores.audit.as_ref()).await;
    }

    #[tokio::test]
    async fn sled_stores_behave_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            engine_type: StorageEngineType::Sled,
            data_directory: dir.path().join("db"),
        };
        let kept = visit();
        {
            let stores = create_stores(&config).unwrap();
            exercise_visit_store(stores.visits.as_ref()).await;
            exercise_audit_store(stores.audit.as_ref()).await;
            stores.visits.insert(&kept).await.unwrap();
        }
        let reopened = create_stores(&config).unwrap();
        assert_eq!(reopened.visits.get(&kept.id).await.unwrap(), Some(kept));
        assert_eq!(reopened.audit.entries().await.unwrap().len(), 2);
    }
}
