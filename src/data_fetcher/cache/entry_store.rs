//! LRU-bounded key/entry storage with a fixture id → keys index

use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use tracing::debug;

use super::types::{CacheEntry, CacheKey};
use crate::data_fetcher::models::{FixtureId, FixtureStatus};

/// Pure storage: no freshness decisions are made here.
///
/// The index always reflects exactly the entries currently held, including
/// withheld ids of list entries, so invalidation never scans keys.
#[derive(Debug)]
pub struct EntryStore {
    entries: LruCache<CacheKey, CacheEntry>,
    index: HashMap<FixtureId, HashSet<CacheKey>>,
}

impl EntryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            index: HashMap::new(),
        }
    }

    /// Looks up an entry and marks it most recently used
    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Looks up an entry without touching recency
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    /// Inserts or replaces an entry. Returns the entry evicted to make room,
    /// if the insert pushed out a different key.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        let key = entry.key.clone();
        let ids = entry.payload.fixture_ids();

        let displaced = self.entries.push(key.clone(), entry);
        let evicted = match displaced {
            Some((old_key, old_entry)) => {
                self.unindex(&old_key, &old_entry.payload.fixture_ids());
                (old_key != key).then_some(old_entry)
            }
            None => None,
        };

        for id in ids {
            self.index.entry(id).or_default().insert(key.clone());
        }

        if let Some(evicted) = &evicted {
            debug!("LRU evicted cache entry {}", evicted.key);
        }
        evicted
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.entries.pop(key)?;
        self.unindex(key, &removed.payload.fixture_ids());
        Some(removed)
    }

    /// Every key whose entry refers to `id`
    pub fn keys_for_fixture(&self, id: FixtureId) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .index
            .get(&id)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Last status seen for `id` in any held entry: the single-fixture entry
    /// first, then any list entry carrying the fixture.
    pub fn cached_status(&self, id: FixtureId) -> Option<FixtureStatus> {
        let single = CacheKey::Fixture(id);
        if let Some(fixture) = self.peek(&single).and_then(|e| e.payload.find(id)) {
            return Some(fixture.status.code.clone());
        }

        self.index.get(&id)?.iter().find_map(|key| {
            self.peek(key)
                .and_then(|e| e.payload.find(id))
                .map(|f| f.status.code.clone())
        })
    }

    /// Removes every entry matching the predicate, returning how many went
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&CacheEntry) -> bool,
    {
        let doomed: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(key, _)| key.clone())
            .collect();

        doomed.iter().filter(|key| self.remove(key).is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.entries.cap().get()
    }

    /// Number of fixture ids currently indexed
    pub fn indexed_fixtures(&self) -> usize {
        self.index.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    fn unindex(&mut self, key: &CacheKey, ids: &[FixtureId]) {
        for id in ids {
            if let Some(keys) = self.index.get_mut(id) {
                keys.remove(key);
                if keys.is_empty() {
                    self.index.remove(id);
                }
            }
        }
    }
}
