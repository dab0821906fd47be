// lib/src/audit/mod.rs

pub mod change_tracker;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use tokio::sync::Mutex;
use uuid::Uuid;

use models::medical::{Actor, AuditAction, AuditLogEntry, Visit};

pub use change_tracker::diff_visits;

use crate::errors::Result;
use crate::storage_engine::AuditStore;

#[derive(Debug, Clone, Copy)]
struct Cursor {
    sequence: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Append-only audit trail. Appends are serialized so sequence numbers and
/// timestamps both follow commit order.
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
    cursor: Mutex<Cursor>,
}

impl AuditLogger {
    /// Resumes numbering after whatever the store already holds.
    pub async fn new(store: Arc<dyn AuditStore>) -> Result<Self> {
        let last = store.last().await?;
        let cursor = Cursor {
            sequence: last.as_ref().map_or(0, |e| e.sequence),
            last_timestamp: last.map(|e| e.timestamp),
        };
        info!("Audit log opened at sequence {} ({})", cursor.sequence, store.get_type());
        Ok(AuditLogger {
            store,
            cursor: Mutex::new(cursor),
        })
    }

    pub async fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        visit_id: Uuid,
        before: Option<&Visit>,
        after: Option<&Visit>,
        now: DateTime<Utc>,
    ) -> Result<AuditLogEntry> {
        let mut cursor = self.cursor.lock().await;

        let timestamp = match cursor.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            sequence: cursor.sequence + 1,
            visit_id,
            actor_id: actor.id.clone(),
            actor_username: actor.username.clone(),
            action,
            changed_fields: diff_visits(before, after),
            timestamp,
            actor_ip: actor.ip.clone(),
        };

        self.store.append(&entry).await?;
        cursor.sequence = entry.sequence;
        cursor.last_timestamp = Some(entry.timestamp);
        debug!(
            "Audit #{} {} on visit {} by {} ({} field(s))",
            entry.sequence,
            action,
            visit_id,
            actor.id,
            entry.changed_fields.len()
        );
        Ok(entry)
    }

    /// Entries ascending by timestamp, optionally narrowed by visit and action.
    pub async fn query(
        &self,
        visit_id: Option<Uuid>,
        action: Option<AuditAction>,
    ) -> Result<Vec<AuditLogEntry>> {
        let mut entries: Vec<AuditLogEntry> = self
            .store
            .entries()
            .await?
            .into_iter()
            .filter(|e| visit_id.is_none_or(|id| e.visit_id == id))
            .filter(|e| action.is_none_or(|a| e.action == a))
            .collect();
        entries.sort_by_key(|e| (e.timestamp, e.sequence));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::InMemoryAuditStore;
    use chrono::TimeZone;
    use models::medical::Role;

    fn actor() -> Actor {
        Actor::new("u-1", Role::Doctor)
            .with_username("dr.who")
            .with_ip("10.1.2.3")
    }

    #[tokio::test]
    async fn timestamps_strictly_increase_even_with_a_stuck_clock() {
        let logger = AuditLogger::new(Arc::new(InMemoryAuditStore::new())).await.unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let id = Uuid::new_v4();
        let a = logger.record(&actor(), AuditAction::Create, id, None, None, now).await.unwrap();
        let b = logger.record(&actor(), AuditAction::Update, id, None, None, now).await.unwrap();
        let c = logger
            .record(&actor(), AuditAction::Delete, id, None, None, now - Duration::seconds(5))
            .await
            .unwrap();
        assert!(a.timestamp < b.timestamp && b.timestamp < c.timestamp);
        assert_eq!((a.sequence, b.sequence, c.sequence), (1, 2, 3));
        assert_eq!(a.actor_username.as_deref(), Some("dr.who"));
        assert_eq!(a.actor_ip.as_deref(), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn query_filters_by_visit_and_action() {
        let logger = AuditLogger::new(Arc::new(InMemoryAuditStore::new())).await.unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let (v1, v2) = (Uuid::new_v4(), Uuid::new_v4());
        logger.record(&actor(), AuditAction::Create, v1, None, None, now).await.unwrap();
        logger.record(&actor(), AuditAction::Create, v2, None, None, now).await.unwrap();
        logger.record(&actor(), AuditAction::CheckIn, v1, None, None, now).await.unwrap();

        assert_eq!(logger.query(Some(v1), None).await.unwrap().len(), 2);
        assert_eq!(logger.query(None, Some(AuditAction::Create)).await.unwrap().len(), 2);
        let check_ins = logger.query(Some(v1), Some(AuditAction::CheckIn)).await.unwrap();
        assert_eq!(check_ins.len(), 1);
        assert_eq!(logger.query(None, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn resumes_sequence_from_existing_store() {
        let store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
        let now = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let id = Uuid::new_v4();
        {
            let first = AuditLogger::new(store.clone()).await.unwrap();
            first.record(&actor(), AuditAction::Create, id, None, None, now).await.unwrap();
        }
        let second = AuditLogger::new(store).await.unwrap();
        let entry = second.record(&actor(), AuditAction::Update, id, None, None, now).await.unwrap();
        assert_eq!(entry.sequence, 2);
        assert!(entry.timestamp > now);
    }
}
