//! Write path for confirmed rounds.
//!
//! Weighting reads the last saved snapshot as often as it likes; recording happens
//! once per confirmed round and is serialized per pool so two confirmations of the
//! same pool never lose each other's updates. Under the lock each pick is checked
//! against the scope's exclusion cycle again, and the updated records and cycles are
//! committed together.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;

use crate::clock;
use crate::domain::{DRAW_METHOD_WEIGHTED, DrawEvent, DrawScope, ExclusionCycle, HistoryRecord, PoolKey};
use crate::error::{FairDrawError, Result};
use crate::storage::HistoryStore;
use crate::weight::WeightedCandidate;

/// A round the caller has accepted and wants recorded.
#[derive(Debug, Clone)]
pub struct ConfirmedRound {
    pub scope: DrawScope,
    /// Picked candidates with the weight each had when drawn
    pub selected: Vec<WeightedCandidate>,
    pub subject: Option<String>,
    /// Picks each candidate gets in the scope's exclusion cycle; `None` leaves the cycle alone
    pub cycle_limit: Option<u32>,
}

/// Serialized writer for history records and exclusion cycles.
#[derive(Debug)]
pub struct HistoryRecorder {
    store: HistoryStore,
    locks: Mutex<HashMap<PoolKey, Arc<Mutex<()>>>>,
}

impl HistoryRecorder {
    pub fn new(store: HistoryStore) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    fn pool_lock(&self, pool: &PoolKey) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| FairDrawError::Persistence(format!("pool lock table poisoned: {}", e)))?;
        Ok(locks.entry(pool.clone()).or_default().clone())
    }

    /// Run `f` while holding the writer lock of `pool`.
    pub fn with_pool_lock<T>(&self, pool: &PoolKey, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.with_pool_locks(std::slice::from_ref(pool), f)
    }

    /// Run `f` while holding the writer locks of all `pools`.
    ///
    /// Locks are taken in key order, so callers locking overlapping sets cannot deadlock.
    pub fn with_pool_locks<T>(&self, pools: &[PoolKey], f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut ordered: Vec<&PoolKey> = pools.iter().collect();
        ordered.sort();
        ordered.dedup();

        let locks = ordered
            .iter()
            .map(|pool| self.pool_lock(pool))
            .collect::<Result<Vec<_>>>()?;
        let _guards = locks
            .iter()
            .zip(&ordered)
            .map(|(lock, pool)| {
                lock.lock()
                    .map_err(|e| FairDrawError::Persistence(format!("writer lock for {} poisoned: {}", pool, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        f()
    }

    /// Record a confirmed round and return the record as saved.
    pub fn record(&self, round: &ConfirmedRound) -> Result<HistoryRecord> {
        self.record_at(round, clock::now())
    }

    /// Record a confirmed round as of `now`.
    pub fn record_at(&self, round: &ConfirmedRound, now: NaiveDateTime) -> Result<HistoryRecord> {
        let mut saved = self.record_all_at(std::slice::from_ref(round), now)?;
        saved
            .pop()
            .ok_or_else(|| FairDrawError::InvalidRequest("nothing was recorded".to_string()))
    }

    /// Record several rounds as one unit, e.g. both sides of a paired lottery draw.
    ///
    /// Either every round is recorded or none is. A pick that has no room left in its
    /// exclusion cycle fails the whole call with `AlreadyDrawn` and writes nothing.
    /// Returns, per round, the record of its pool as saved.
    pub fn record_all_at(&self, rounds: &[ConfirmedRound], now: NaiveDateTime) -> Result<Vec<HistoryRecord>> {
        if rounds.is_empty() || rounds.iter().any(|r| r.selected.is_empty()) {
            return Err(FairDrawError::InvalidRequest("cannot record a round with no selection".to_string()));
        }

        let pools: Vec<PoolKey> = rounds.iter().map(|r| r.scope.pool.clone()).collect();
        self.with_pool_locks(&pools, || {
            let mut records: BTreeMap<PoolKey, HistoryRecord> = BTreeMap::new();
            let mut cycles: Vec<(DrawScope, ExclusionCycle)> = Vec::new();

            for round in rounds {
                let pool = &round.scope.pool;
                if !records.contains_key(pool) {
                    records.insert(pool.clone(), self.store.try_load(pool)?);
                }

                if let Some(limit) = round.cycle_limit {
                    let slot = match cycles.iter().position(|(scope, _)| *scope == round.scope) {
                        Some(slot) => slot,
                        None => {
                            cycles.push((round.scope.clone(), self.store.try_load_cycle(&round.scope)?));
                            cycles.len() - 1
                        }
                    };
                    let cycle = &mut cycles[slot].1;
                    for pick in &round.selected {
                        let key = pick.candidate.history_key();
                        if cycle.picks_of(key) >= limit {
                            log::warn!("Refusing stale confirmation for {}: {} already used up", round.scope, key);
                            return Err(FairDrawError::AlreadyDrawn {
                                scope: round.scope.to_string(),
                                candidate: key.to_string(),
                            });
                        }
                        cycle.record([key]);
                    }
                }

                if let Some(record) = records.get_mut(pool) {
                    apply_round(record, round, now);
                }
            }

            let record_refs: Vec<(&PoolKey, &HistoryRecord)> = records.iter().collect();
            let cycle_refs: Vec<(&DrawScope, &ExclusionCycle)> = cycles.iter().map(|(s, c)| (s, c)).collect();
            self.store.commit(&record_refs, &cycle_refs)?;

            for round in rounds {
                log::info!(
                    "Recorded round for {}: {} selected",
                    round.scope.pool,
                    round.selected.len()
                );
            }
            Ok(rounds
                .iter()
                .filter_map(|r| records.get(&r.scope.pool).cloned())
                .collect())
        })
    }

    /// Forget which candidates the scope's exclusion cycle has already used.
    pub fn clear_cycle(&self, scope: &DrawScope) -> Result<bool> {
        self.with_pool_lock(&scope.pool, || self.store.clear_cycle(scope))
    }

    /// Wipe every fairness counter of a pool, together with all its exclusion cycles.
    pub fn clear_history(&self, pool: &PoolKey) -> Result<()> {
        self.with_pool_lock(pool, || {
            let removed = self.store.remove(pool)?;
            let cycles = self.store.clear_pool_cycles(pool)?;
            log::info!("Cleared history for {} (record removed: {}, cycles cleared: {})", pool, removed, cycles);
            Ok(())
        })
    }
}

/// Fold one confirmed round into `record`.
pub fn apply_round(record: &mut HistoryRecord, round: &ConfirmedRound, now: NaiveDateTime) {
    let group_filter = round.scope.group.as_option();
    let gender_filter = round.scope.gender.as_option();
    let batch_size = round.selected.len() as u32;
    let subject = round.subject.as_deref().filter(|s| !s.trim().is_empty());

    let selected_keys: Vec<&str> = round.selected.iter().map(|w| w.candidate.history_key()).collect();

    for (name, entity) in record.entities.iter_mut() {
        if !selected_keys.contains(&name.as_str()) {
            entity.rounds_missed += 1;
        }
    }

    for pick in &round.selected {
        let entity = record.entities.entry(pick.candidate.history_key().to_string()).or_default();
        entity.total_count += 1;
        entity.last_drawn_time = Some(now);
        entity.rounds_missed = 0;
        if group_filter.is_some() {
            entity.group_hit_count += 1;
        }
        if gender_filter.is_some() {
            entity.gender_hit_count += 1;
        }
        if let Some(subject) = subject {
            let tally = entity.subject_stats.entry(subject.to_string()).or_default();
            tally.total_count += 1;
            if group_filter.is_some() && gender_filter.is_some() {
                tally.group_gender_count += 1;
            }
        }
        entity.history.push(DrawEvent {
            method: DRAW_METHOD_WEIGHTED,
            time: now,
            batch_size,
            group_filter: group_filter.map(str::to_string),
            gender_filter: gender_filter.map(str::to_string),
            weight_at_draw: Some(pick.weight),
            subject: subject.map(str::to_string),
        });
    }

    for pick in &round.selected {
        if let Some(group) = pick.candidate.group.as_deref().filter(|g| !g.is_empty()) {
            *record.group_stats.entry(group.to_string()).or_insert(0) += 1;
        }
        if let Some(gender) = pick.candidate.gender.as_deref().filter(|g| !g.is_empty()) {
            *record.gender_stats.entry(gender.to_string()).or_insert(0) += 1;
        }
    }

    if let Some(subject) = subject {
        let aggregate = record.subject_stats.entry(subject.to_string()).or_default();
        aggregate.total_rounds += 1;
        aggregate.total_selections += round.selected.len() as u64;
        for pick in &round.selected {
            if let Some(group) = pick.candidate.group.as_deref().filter(|g| !g.is_empty()) {
                *aggregate.group_stats.entry(group.to_string()).or_insert(0) += 1;
            }
            if let Some(gender) = pick.candidate.gender.as_deref().filter(|g| !g.is_empty()) {
                *aggregate.gender_stats.entry(gender.to_string()).or_insert(0) += 1;
            }
        }
    }

    record.total_rounds += 1;
    record.total_selections += round.selected.len() as u64;
}
