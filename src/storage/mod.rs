//! Storage layer for fairdraw.
//!
//! `HistoryStore` is the typed front door: it loads and saves per-pool
//! [`HistoryRecord`]s and per-scope [`ExclusionCycle`]s on top of any
//! [`DocumentStore`] backend:
//! - **JsonFileStore**: one JSON file per document, replaced atomically
//! - **SqliteStore**: one table, one transaction per write
//!
//! `load` and `load_cycle` never fail from the caller's point of view: a missing or
//! unreadable document is logged and replaced by an empty one. The write path uses the
//! `try_` variants so an unreadable record is never overwritten. Saves retry a bounded
//! number of times and then surface `FairDrawError::Persistence`; [`HistoryStore::commit`]
//! writes records and cycles of one confirmation as a single unit.
//!
//! # Example
//!
//! ```ignore
//! use fairdraw::domain::PoolKey;
//! use fairdraw::storage::HistoryStore;
//!
//! let store = HistoryStore::open_json("/tmp/fairdraw")?;
//! let pool = PoolKey::roll_call("Class 3");
//! let mut record = store.load(&pool);
//! record.total_rounds += 1;
//! store.save(&pool, &record)?;
//! ```

mod json_file;
mod retry;
mod sqlite;
mod traits;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{DrawScope, ExclusionCycle, FilterSentinels, HistoryRecord, PoolKey};
use crate::error::Result;

pub use json_file::JsonFileStore;
pub use retry::{DEFAULT_ATTEMPTS, DEFAULT_BACKOFF_MS, RetryPolicy};
pub use sqlite::SqliteStore;
pub use traits::{Collection, DocumentKey, DocumentStore};

/// Typed access to draw history and exclusion cycles.
#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    sentinels: FilterSentinels,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("retry", &self.retry)
            .field("sentinels", &self.sentinels)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    pub fn new(backend: impl DocumentStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            retry: RetryPolicy::default(),
            sentinels: FilterSentinels::default(),
        }
    }

    /// File-backed store rooted at `dir`.
    pub fn open_json(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(JsonFileStore::new(dir)?))
    }

    /// SQLite-backed store at `path`.
    pub fn open_sqlite(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SqliteStore::open(path)?))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Labels that legacy records used for "no filter".
    pub fn with_sentinels(mut self, sentinels: FilterSentinels) -> Self {
        self.sentinels = sentinels;
        self
    }

    pub fn sentinels(&self) -> &FilterSentinels {
        &self.sentinels
    }

    fn history_key(pool: &PoolKey) -> DocumentKey {
        DocumentKey::new(Collection::History, pool.kind, pool.name.clone())
    }

    fn cycle_key(scope: &DrawScope) -> DocumentKey {
        DocumentKey::new(Collection::Cycles, scope.pool.kind, scope.storage_name())
    }

    fn try_load_document<T: DeserializeOwned>(&self, key: &DocumentKey) -> Result<Option<T>> {
        let raw = self.retry.run(&format!("load {}", key), || self.backend.get(key))?;
        match raw {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn save_document<T: Serialize>(&self, key: &DocumentKey, value: &T) -> Result<()> {
        let document = serde_json::to_value(value)?;
        self.retry.run(&format!("save {}", key), || self.backend.put(key, &document))
    }

    /// Save pool records and exclusion cycles together: either every document is
    /// written or none is.
    pub fn commit(&self, records: &[(&PoolKey, &HistoryRecord)], cycles: &[(&DrawScope, &ExclusionCycle)]) -> Result<()> {
        let mut documents = Vec::with_capacity(records.len() + cycles.len());
        for (pool, record) in records {
            documents.push((Self::history_key(pool), serde_json::to_value(record)?));
        }
        for (scope, cycle) in cycles {
            documents.push((Self::cycle_key(scope), serde_json::to_value(cycle)?));
        }

        self.retry
            .run(&format!("commit {} documents", documents.len()), || self.backend.put_many(&documents))?;
        log::debug!("Committed {} records and {} cycles", records.len(), cycles.len());
        Ok(())
    }

    /// Load a pool's history, surfacing read errors.
    ///
    /// A pool that was never saved yields a zero record.
    pub fn try_load(&self, pool: &PoolKey) -> Result<HistoryRecord> {
        let mut record: HistoryRecord = self
            .try_load_document(&Self::history_key(pool))?
            .unwrap_or_default();
        record.normalize(&self.sentinels);
        Ok(record)
    }

    /// Load a pool's history; any failure is logged and yields a zero record.
    pub fn load(&self, pool: &PoolKey) -> HistoryRecord {
        self.try_load(pool).unwrap_or_else(|e| {
            log::warn!("Could not load history for {}, starting empty: {}", pool, e);
            HistoryRecord::default()
        })
    }

    /// Persist a pool's history atomically.
    pub fn save(&self, pool: &PoolKey, record: &HistoryRecord) -> Result<()> {
        self.save_document(&Self::history_key(pool), record)?;
        log::debug!("Saved history for {} ({} rounds)", pool, record.total_rounds);
        Ok(())
    }

    /// Delete a pool's history. Returns whether anything was stored.
    pub fn remove(&self, pool: &PoolKey) -> Result<bool> {
        let key = Self::history_key(pool);
        self.retry.run(&format!("remove {}", key), || self.backend.remove(&key))
    }

    /// Load the exclusion cycle of a scope, surfacing read errors.
    pub fn try_load_cycle(&self, scope: &DrawScope) -> Result<ExclusionCycle> {
        Ok(self.try_load_document(&Self::cycle_key(scope))?.unwrap_or_default())
    }

    /// Load the exclusion cycle of a scope; failures are logged and yield an empty cycle.
    pub fn load_cycle(&self, scope: &DrawScope) -> ExclusionCycle {
        self.try_load_cycle(scope).unwrap_or_else(|e| {
            log::warn!("Could not load exclusion cycle for {}, starting empty: {}", scope, e);
            ExclusionCycle::default()
        })
    }

    pub fn save_cycle(&self, scope: &DrawScope, cycle: &ExclusionCycle) -> Result<()> {
        self.save_document(&Self::cycle_key(scope), cycle)
    }

    /// Forget the exclusion cycle of one scope. Returns whether one was stored.
    pub fn clear_cycle(&self, scope: &DrawScope) -> Result<bool> {
        let key = Self::cycle_key(scope);
        self.retry.run(&format!("remove {}", key), || self.backend.remove(&key))
    }

    /// Forget every exclusion cycle of a pool, whatever its filters. Returns how many.
    pub fn clear_pool_cycles(&self, pool: &PoolKey) -> Result<usize> {
        let prefix = DrawScope::whole_pool(pool.clone()).storage_prefix();
        let names = self.retry.run(&format!("list cycles of {}", pool), || {
            self.backend.names(Collection::Cycles, pool.kind)
        })?;

        let mut cleared = 0;
        for name in names.into_iter().filter(|n| n.starts_with(&prefix)) {
            let key = DocumentKey::new(Collection::Cycles, pool.kind, name);
            if self.retry.run(&format!("remove {}", key), || self.backend.remove(&key))? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DrawEvent, DrawFilter, EntityHistory, SubjectAggregate};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (HistoryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::open_json(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn sample_record() -> HistoryRecord {
        let mut record = HistoryRecord::default();
        let event = DrawEvent {
            method: 1,
            time: crate::clock::parse_timestamp("2024-05-06 10:00:00").unwrap(),
            batch_size: 1,
            group_filter: Some("2".to_string()),
            gender_filter: None,
            weight_at_draw: Some(1.25),
            subject: Some("Physics".to_string()),
        };
        record.entities.insert(
            "Ann".to_string(),
            EntityHistory {
                total_count: 1,
                group_hit_count: 1,
                gender_hit_count: 0,
                last_drawn_time: Some(event.time),
                rounds_missed: 0,
                history: vec![event],
                subject_stats: Default::default(),
            },
        );
        record.group_stats.insert("2".to_string(), 1);
        record.subject_stats.insert(
            "Physics".to_string(),
            SubjectAggregate {
                total_rounds: 1,
                total_selections: 1,
                ..Default::default()
            },
        );
        record.total_rounds = 1;
        record.total_selections = 1;
        record
    }

    #[test]
    fn test_load_missing_pool_is_zero_record() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.load(&PoolKey::roll_call("new")), HistoryRecord::default());
    }

    #[test]
    fn test_round_trip() {
        let (store, _temp) = create_test_store();
        let pool = PoolKey::roll_call("Class 1");
        let record = sample_record();
        store.save(&pool, &record).unwrap();
        assert_eq!(store.load(&pool), record);
    }

    #[test]
    fn test_round_trip_sqlite() {
        let store = HistoryStore::new(SqliteStore::open_in_memory().unwrap());
        let pool = PoolKey::lottery("Spring fair");
        let record = sample_record();
        store.save(&pool, &record).unwrap();
        assert_eq!(store.try_load(&pool).unwrap(), record);
    }

    #[test]
    fn test_pool_kinds_do_not_collide() {
        let (store, _temp) = create_test_store();
        store.save(&PoolKey::roll_call("same"), &sample_record()).unwrap();
        assert!(store.load(&PoolKey::lottery("same")).is_empty());
    }

    #[test]
    fn test_corrupt_document_falls_back_to_empty() {
        let backend = SqliteStore::open_in_memory().unwrap();
        let pool = PoolKey::roll_call("broken");
        backend
            .put(
                &DocumentKey::new(Collection::History, pool.kind, pool.name.clone()),
                &json!({"total_rounds": "many"}),
            )
            .unwrap();
        let store = HistoryStore::new(backend).with_retry(RetryPolicy::none());

        assert!(store.try_load(&pool).is_err());
        assert_eq!(store.load(&pool), HistoryRecord::default());
    }

    #[test]
    fn test_legacy_document_is_normalized() {
        let backend = SqliteStore::open_in_memory().unwrap();
        let pool = PoolKey::roll_call("legacy");
        backend
            .put(
                &DocumentKey::new(Collection::History, pool.kind, pool.name.clone()),
                &json!({"students": {"Bo": {"total_count": 1, "history": [
                    {"draw_time": "2024-01-01 08:00:00", "draw_group": "Whole class", "draw_gender": "M"}
                ]}}}),
            )
            .unwrap();
        let store = HistoryStore::new(backend).with_sentinels(FilterSentinels {
            all_groups: "Whole class".to_string(),
            all_genders: "Everyone".to_string(),
        });

        let record = store.load(&pool);
        let bo = record.entity("Bo").unwrap();
        assert_eq!(bo.history[0].group_filter, None);
        assert_eq!(bo.group_hit_count, 0);
        assert_eq!(bo.gender_hit_count, 1);
        assert_eq!(record.total_rounds, 0);
    }

    #[test]
    fn test_remove_history() {
        let (store, _temp) = create_test_store();
        let pool = PoolKey::roll_call("c");
        store.save(&pool, &sample_record()).unwrap();
        assert!(store.remove(&pool).unwrap());
        assert!(store.load(&pool).is_empty());
    }

    #[test]
    fn test_cycles_are_scoped_by_filter() {
        let (store, _temp) = create_test_store();
        let pool = PoolKey::roll_call("c");
        let girls = DrawScope::new(pool.clone(), DrawFilter::All, DrawFilter::only("F"));
        let everyone = DrawScope::whole_pool(pool.clone());

        let mut cycle = ExclusionCycle::default();
        cycle.record(["Ann"]);
        store.save_cycle(&girls, &cycle).unwrap();

        assert_eq!(store.load_cycle(&girls), cycle);
        assert!(store.load_cycle(&everyone).is_empty());

        assert!(store.clear_cycle(&girls).unwrap());
        assert!(store.load_cycle(&girls).is_empty());
    }

    #[test]
    fn test_commit_writes_records_and_cycles() {
        let store = HistoryStore::new(SqliteStore::open_in_memory().unwrap());
        let pool = PoolKey::roll_call("c");
        let scope = DrawScope::new(pool.clone(), DrawFilter::only("1"), DrawFilter::All);
        let mut cycle = ExclusionCycle::default();
        cycle.record(["Ann"]);

        store.commit(&[(&pool, &sample_record())], &[(&scope, &cycle)]).unwrap();
        assert_eq!(store.try_load(&pool).unwrap(), sample_record());
        assert_eq!(store.try_load_cycle(&scope).unwrap(), cycle);
    }

    #[test]
    fn test_clear_pool_cycles_leaves_other_pools() {
        let (store, _temp) = create_test_store();
        let mut cycle = ExclusionCycle::default();
        cycle.record(["Ann"]);

        let c1 = PoolKey::roll_call("c1");
        let c10 = PoolKey::roll_call("c10");
        store.save_cycle(&DrawScope::whole_pool(c1.clone()), &cycle).unwrap();
        store
            .save_cycle(&DrawScope::new(c1.clone(), DrawFilter::only("2"), DrawFilter::All), &cycle)
            .unwrap();
        store.save_cycle(&DrawScope::whole_pool(c10.clone()), &cycle).unwrap();

        assert_eq!(store.clear_pool_cycles(&c1).unwrap(), 2);
        assert!(!store.load_cycle(&DrawScope::whole_pool(c10)).is_empty());
    }
}
