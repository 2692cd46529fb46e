//! Durable tier for past, fully concluded date buckets

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::durable_store::DurableStore;
use super::freshness::FreshnessPolicy;
use crate::clock::{TimeContext, ViewerZone};
use crate::constants::{CACHE_VERSION, persistence};
use crate::data_fetcher::models::Fixture;
use crate::error::AppError;

/// One persisted date bucket, always overwritten whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub date: NaiveDate,
    pub fixtures: Vec<Fixture>,
    pub written_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn store_key(date: NaiveDate) -> String {
        format!("{}{}", persistence::RECORD_PREFIX, date)
    }
}

/// Describes the first fixture that does not kick off on `date` in the
/// viewer's timezone, if any.
pub(crate) fn date_integrity_violation(
    fixtures: &[Fixture],
    date: NaiveDate,
    zone: &ViewerZone,
) -> Option<String> {
    fixtures
        .iter()
        .find_map(|fixture| match fixture.local_date(zone) {
            Ok(local) if local == date => None,
            Ok(local) => Some(format!("fixture {} is on {} not {}", fixture.id, local, date)),
            Err(e) => Some(format!("fixture {}: {}", fixture.id, e)),
        })
}

fn is_record_key(key: &str) -> bool {
    key.starts_with(persistence::RECORD_PREFIX)
}

#[derive(Debug, Clone)]
pub struct PersistentTier {
    store: Arc<dyn DurableStore>,
    preserved_keys: Vec<String>,
}

impl PersistentTier {
    /// Opens the tier over `store`, wiping every record when the stored
    /// version marker differs from [`CACHE_VERSION`].
    pub fn open(store: Arc<dyn DurableStore>, preserved_keys: Vec<String>) -> Result<Self, AppError> {
        let tier = Self {
            store,
            preserved_keys,
        };

        let stored_version = tier.store.get(persistence::VERSION_KEY)?;
        if stored_version.as_deref() != Some(CACHE_VERSION) {
            let removed = tier.store.retain(&|key| !is_record_key(key))?;
            info!(
                "Cache version changed ({:?} -> {}), wiped {} persisted records",
                stored_version, CACHE_VERSION, removed
            );
            tier.store.set(persistence::VERSION_KEY, CACHE_VERSION)?;
        }

        Ok(tier)
    }

    /// Writes a record, running an emergency cleanup and retrying once if the
    /// store is out of space.
    pub fn write(&self, record: &PersistedRecord) -> Result<(), AppError> {
        let key = PersistedRecord::store_key(record.date);
        let value = serde_json::to_string(record)?;

        match self.store.set(&key, &value) {
            Ok(()) => {
                debug!("Persisted {} fixtures under {}", record.fixtures.len(), key);
                Ok(())
            }
            Err(e) if e.is_quota_exceeded() => {
                warn!("Durable store full while writing {}: {}", key, e);
                self.emergency_cleanup()?;
                self.store.set(&key, &value)?;
                info!("Persisted {} after emergency cleanup", key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reads and validates the record for `date`.
    ///
    /// Unparseable, inconsistent and expired records are deleted and read as
    /// a miss. Store failures are logged and also read as a miss.
    pub fn read(
        &self,
        date: NaiveDate,
        policy: &FreshnessPolicy,
        ctx: &TimeContext,
    ) -> Option<PersistedRecord> {
        let key = PersistedRecord::store_key(date);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read persisted record {}: {}", key, e);
                return None;
            }
        };

        let record = match serde_json::from_str::<PersistedRecord>(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Deleting unparseable persisted record {}: {}", key, e);
                self.remove_logged(&key);
                return None;
            }
        };

        let violation = if record.date != date {
            Some(format!("record is dated {}", record.date))
        } else {
            date_integrity_violation(&record.fixtures, date, &ctx.zone)
        };
        if let Some(violation) = violation {
            warn!("Deleting persisted record {} ({})", key, violation);
            self.remove_logged(&key);
            return None;
        }

        if policy.is_record_expired(date, record.written_at, ctx) {
            debug!("Persisted record {} expired", key);
            self.remove_logged(&key);
            return None;
        }

        Some(record)
    }

    pub fn remove(&self, date: NaiveDate) -> Result<(), AppError> {
        self.store.remove(&PersistedRecord::store_key(date))
    }

    /// Number of persisted records
    pub fn len(&self) -> usize {
        self.record_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletes expired and unreadable records, returning how many went
    pub fn purge_expired(&self, policy: &FreshnessPolicy, ctx: &TimeContext) -> usize {
        let mut purged = 0;
        for key in self.record_keys() {
            let expired = match self.store.get(&key) {
                Ok(Some(raw)) => match serde_json::from_str::<PersistedRecord>(&raw) {
                    Ok(record) => policy.is_record_expired(record.date, record.written_at, ctx),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(e) => {
                    warn!("Failed to read persisted record {}: {}", key, e);
                    false
                }
            };
            if expired && self.remove_logged(&key) {
                purged += 1;
            }
        }
        if purged > 0 {
            info!("Purged {} expired persisted records", purged);
        }
        purged
    }

    /// Deletes every persisted record, leaving other keys alone
    pub fn clear(&self) -> Result<usize, AppError> {
        self.store.retain(&|key| !is_record_key(key))
    }

    /// Removes every key outside the preserved allow-list
    pub fn emergency_cleanup(&self) -> Result<usize, AppError> {
        let preserved = &self.preserved_keys;
        let removed = self
            .store
            .retain(&|key| key == persistence::VERSION_KEY || preserved.iter().any(|p| p == key))?;
        warn!("Emergency cleanup removed {} durable keys", removed);
        Ok(removed)
    }

    fn record_keys(&self) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys.into_iter().filter(|k| is_record_key(k)).collect(),
            Err(e) => {
                warn!("Failed to list durable store keys: {}", e);
                Vec::new()
            }
        }
    }

    fn remove_logged(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to delete persisted record {}: {}", key, e);
                false
            }
        }
    }
}
