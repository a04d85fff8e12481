use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::state_store::{StateStore, StateStoreExt};
use crate::types::IdeMode;

/// A heartbeat older than this no longer holds the lock
pub const HEARTBEAT_STALE_AFTER: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceLockRecord {
    pub owner_id: String,
    pub last_heartbeat: DateTime<Utc>,
}

impl InstanceLockRecord {
    /// Time since the last heartbeat; a heartbeat from the future counts as fresh
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_heartbeat).to_std().unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LockDecision {
    /// This instance holds the lock and refreshed its heartbeat
    Acquired,
    /// Another live instance holds it
    Standby { owner_id: String, age: Duration },
}

/// One lock record per IDE flavor; the owner refreshes its heartbeat every
/// tick and anyone else stands by until it goes stale
pub struct InstanceLock {
    store: Arc<dyn StateStore>,
    ide: IdeMode,
    owner_id: String,
}

pub fn lock_key(ide: IdeMode) -> String {
    format!("lock.{}", ide)
}

impl InstanceLock {
    pub fn new(store: Arc<dyn StateStore>, ide: IdeMode) -> Self {
        Self::with_owner_id(store, ide, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_owner_id(store: Arc<dyn StateStore>, ide: IdeMode, owner_id: String) -> Self {
        Self {
            store,
            ide,
            owner_id,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn record(&self) -> Option<InstanceLockRecord> {
        self.store.get(&lock_key(self.ide), None)
    }

    /// Read the record and either refresh it as ours or stand by, in one
    /// locked read-modify-write.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Result<LockDecision> {
        let key = lock_key(self.ide);
        let mut decision = LockDecision::Acquired;

        self.store.update(&mut |map| {
            let existing: Option<InstanceLockRecord> = map
                .get(&key)
                .and_then(|value| serde_json::from_value(value.clone()).ok());

            if let Some(record) = existing
                && record.owner_id != self.owner_id
            {
                let age = record.age(now);
                if age < HEARTBEAT_STALE_AFTER {
                    decision = LockDecision::Standby {
                        owner_id: record.owner_id,
                        age,
                    };
                    return Ok(());
                }
                info!(
                    "Taking over {} lock from {} (heartbeat {}s old)",
                    self.ide,
                    record.owner_id,
                    age.as_secs()
                );
            }

            let ours = InstanceLockRecord {
                owner_id: self.owner_id.clone(),
                last_heartbeat: now,
            };
            map.insert(key.clone(), serde_json::to_value(&ours)?);
            decision = LockDecision::Acquired;
            Ok(())
        })?;

        Ok(decision)
    }

    /// Clear the record if we own it. Returns whether anything was cleared.
    pub fn release(&self) -> Result<bool> {
        let key = lock_key(self.ide);
        let mut released = false;

        self.store.update(&mut |map| {
            let ours = map
                .get(&key)
                .and_then(|value| serde_json::from_value::<InstanceLockRecord>(value.clone()).ok())
                .is_some_and(|record| record.owner_id == self.owner_id);
            if ours {
                map.remove(&key);
                released = true;
            }
            Ok(())
        })?;

        if released {
            debug!("Released {} lock", self.ide);
        }
        Ok(released)
    }
}

#[cfg(test)]
#[path = "instance_lock_test.rs"]
mod instance_lock_test;
