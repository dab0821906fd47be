// lib/src/locks.rs

//! Per-dimension advisory locks held across validate, detect and persist.
//!
//! Keys are always taken in `LockKey` order and visit keys order before every
//! dimension key, so a task that extends its set with dimension keys after
//! loading a visit cannot form a cycle with another task.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};

use log::trace;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Visit(Uuid),
    Doctor(String),
    Location(String),
    Patient(String),
}

impl LockKey {
    /// Locations compare case-insensitively in conflict detection, so their
    /// lock keys are normalized the same way.
    pub fn location(name: &str) -> Self {
        LockKey::Location(name.trim().to_lowercase())
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Visit(id) => write!(f, "visit:{}", id),
            LockKey::Doctor(id) => write!(f, "doctor:{}", id),
            LockKey::Location(name) => write!(f, "location:{}", name),
            LockKey::Patient(id) => write!(f, "patient:{}", id),
        }
    }
}

type Table = Arc<StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>>;

#[derive(Debug, Clone, Default)]
pub struct DimensionLocks {
    table: Table,
}

impl DimensionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire<I>(&self, keys: I) -> LockSet
    where
        I: IntoIterator<Item = LockKey>,
    {
        let mut set = LockSet {
            table: self.table.clone(),
            held: BTreeSet::new(),
            guards: Vec::new(),
        };
        set.extend(keys).await;
        set
    }

    fn slot(table: &Table, key: &LockKey) -> Arc<Mutex<()>> {
        let mut map = table.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(key.clone()).or_default().clone()
    }

    /// Number of keys currently tracked; idle keys are pruned on release.
    pub fn tracked(&self) -> usize {
        self.table.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Guards for a set of keys; everything is released on drop.
#[derive(Debug)]
pub struct LockSet {
    table: Table,
    held: BTreeSet<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    /// Takes additional keys in order, skipping those already held.
    pub async fn extend<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = LockKey>,
    {
        let wanted: BTreeSet<LockKey> = keys
            .into_iter()
            .filter(|k| !self.held.contains(k))
            .collect();
        for key in wanted {
            let slot = DimensionLocks::slot(&self.table, &key);
            trace!("Waiting for lock {}", key);
            self.guards.push(slot.lock_owned().await);
            self.held.insert(key);
        }
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        self.guards.clear();
        let mut map = self.table.lock().unwrap_or_else(|p| p.into_inner());
        for key in &self.held {
            if map.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                map.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_holder_waits_until_release() {
        let locks = DimensionLocks::new();
        let first = locks.acquire([LockKey::Doctor("d-1".into())]).await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _set = contender
                .acquire([LockKey::location("Room 1"), LockKey::Doctor("d-1".into())])
                .await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn disjoint_keys_do_not_block() {
        let locks = DimensionLocks::new();
        let _a = locks.acquire([LockKey::Patient("p-1".into())]).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire([LockKey::Patient("p-2".into())]),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn extend_skips_keys_already_held() {
        let locks = DimensionLocks::new();
        let id = Uuid::new_v4();
        let mut set = locks.acquire([LockKey::Visit(id)]).await;
        set.extend([LockKey::Visit(id), LockKey::Doctor("d-1".into())]).await;
        assert!(set.held.contains(&LockKey::Doctor("d-1".into())));
        assert_eq!(locks.tracked(), 2);
    }

    #[test]
    fn visit_keys_order_first() {
        let mut keys = vec![
            LockKey::Patient("a".into()),
            LockKey::location("Room"),
            LockKey::Visit(Uuid::nil()),
            LockKey::Doctor("z".into()),
        ];
        keys.sort();
        assert!(matches!(keys[0], LockKey::Visit(_)));
        assert_eq!(keys[2].to_string(), "location:room");
    }
}
