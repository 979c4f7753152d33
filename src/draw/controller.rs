//! Draw orchestration: history in, weighted selection out, recording on confirm.
//!
//! A draw walks `Idle -> Weighing -> Sampling -> Result | ResetRequired`; a confirmed
//! result moves on to `Recorded` and back to `Idle`. Only confirmation writes.

use std::fmt;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::display::DisplayTemplate;
use super::mode::RepeatMode;
use super::outcome::{Assignee, DrawOutcome, DrawResult, PairedDraw, PrizeAssignment};
use super::sampling::{uniform_preview, weighted_with_replacement, weighted_without_replacement};
use crate::clock;
use crate::domain::{Candidate, DrawScope, HistoryRecord, PoolKey};
use crate::error::{FairDrawError, Result};
use crate::history::{ConfirmedRound, HistoryRecorder, filter_by_subject};
use crate::storage::HistoryStore;
use crate::weight::{WeightSettings, WeightedCandidate, compute_weights_at};

/// Where the controller is in its draw cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawPhase {
    #[default]
    Idle,
    Weighing,
    Sampling,
    Result,
    ResetRequired,
    Recorded,
}

impl fmt::Display for DrawPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DrawPhase::Idle => "idle",
            DrawPhase::Weighing => "weighing",
            DrawPhase::Sampling => "sampling",
            DrawPhase::Result => "result",
            DrawPhase::ResetRequired => "reset_required",
            DrawPhase::Recorded => "recorded",
        };
        f.write_str(s)
    }
}

/// One draw as requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRequest {
    pub scope: DrawScope,
    pub count: usize,
    #[serde(default)]
    pub mode: RepeatMode,
    /// Subject or class period; narrows the history used for weighting
    #[serde(default)]
    pub subject: Option<String>,
}

impl DrawRequest {
    pub fn new(scope: DrawScope, count: usize, mode: RepeatMode) -> Self {
        Self {
            scope,
            count,
            mode,
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Turns weights into selections and confirmed selections into history.
#[derive(Debug)]
pub struct DrawController {
    recorder: HistoryRecorder,
    settings: WeightSettings,
    phase: Mutex<DrawPhase>,
}

impl DrawController {
    pub fn new(store: HistoryStore, settings: WeightSettings) -> Self {
        Self {
            recorder: HistoryRecorder::new(store),
            settings,
            phase: Mutex::new(DrawPhase::Idle),
        }
    }

    pub fn store(&self) -> &HistoryStore {
        self.recorder.store()
    }

    pub fn settings(&self) -> &WeightSettings {
        &self.settings
    }

    /// Last phase any draw on this controller reached.
    pub fn phase(&self) -> DrawPhase {
        self.phase.lock().map(|p| *p).unwrap_or_default()
    }

    fn enter(&self, phase: DrawPhase, pool: &PoolKey) {
        tracing::debug!(pool = %pool, phase = %phase, "Draw phase");
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }

    /// History used for weighting, narrowed to a subject when one is given.
    pub fn history_for(&self, pool: &PoolKey, subject: Option<&str>) -> HistoryRecord {
        let record = self.store().load(pool);
        match subject.filter(|s| !s.trim().is_empty()) {
            Some(subject) => filter_by_subject(&record, subject),
            None => record,
        }
    }

    /// Weights of every existing candidate of the pool, in roster order.
    pub fn weights(&self, pool: &PoolKey, candidates: &[Candidate], subject: Option<&str>) -> Vec<WeightedCandidate> {
        self.weights_at(pool, candidates, subject, clock::now())
    }

    pub fn weights_at(
        &self,
        pool: &PoolKey,
        candidates: &[Candidate],
        subject: Option<&str>,
        now: NaiveDateTime,
    ) -> Vec<WeightedCandidate> {
        let history = self.history_for(pool, subject);
        let existing: Vec<Candidate> = candidates.iter().filter(|c| c.exists).cloned().collect();
        compute_weights_at(&existing, &history, &self.settings, now)
    }

    fn filtered<'a>(scope: &DrawScope, candidates: &'a [Candidate]) -> Result<Vec<&'a Candidate>> {
        let filtered = scope.filter_candidates(candidates);
        if filtered.is_empty() {
            return Err(FairDrawError::EmptyCandidatePool {
                pool: scope.pool.name.clone(),
                group: scope.group.to_string(),
                gender: scope.gender.to_string(),
            });
        }
        Ok(filtered)
    }

    /// Perform a weighted draw. Nothing is persisted until [`confirm`](Self::confirm).
    pub fn draw<R: Rng + ?Sized>(
        &self,
        request: &DrawRequest,
        candidates: &[Candidate],
        rng: &mut R,
    ) -> Result<DrawOutcome> {
        self.draw_at(request, candidates, rng, clock::now())
    }

    pub fn draw_at<R: Rng + ?Sized>(
        &self,
        request: &DrawRequest,
        candidates: &[Candidate],
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Result<DrawOutcome> {
        let scope = &request.scope;
        if request.count == 0 {
            return Err(FairDrawError::InvalidRequest("draw count must be at least 1".to_string()));
        }
        let filtered = Self::filtered(scope, candidates)?;

        self.enter(DrawPhase::Weighing, &scope.pool);
        let weighted = self.weights_at(&scope.pool, candidates, request.subject.as_deref(), now);
        let in_scope: Vec<WeightedCandidate> = weighted
            .into_iter()
            .filter(|w| filtered.iter().any(|c| c.id == w.candidate.id && c.name == w.candidate.name))
            .collect();

        let eligible: Vec<WeightedCandidate> = if request.mode.tracks_cycle() {
            let cycle = self.store().load_cycle(scope);
            in_scope
                .into_iter()
                .filter(|w| request.mode.is_eligible(&cycle, w.candidate.history_key()))
                .collect()
        } else {
            in_scope
        };

        if request.mode.tracks_cycle() && eligible.len() < request.count {
            self.enter(DrawPhase::ResetRequired, &scope.pool);
            tracing::info!(
                pool = %scope.pool,
                group = %scope.group,
                gender = %scope.gender,
                eligible = eligible.len(),
                requested = request.count,
                "Exclusion cycle exhausted"
            );
            return Ok(DrawOutcome::ResetRequired(scope.clone()));
        }

        self.enter(DrawPhase::Sampling, &scope.pool);
        let weights: Vec<f64> = eligible.iter().map(|w| w.weight).collect();
        let indices = if request.count <= eligible.len() {
            weighted_without_replacement(&weights, request.count, rng)
        } else {
            weighted_with_replacement(&weights, request.count, rng)
        };
        let selected: Vec<WeightedCandidate> = indices.into_iter().map(|i| eligible[i].clone()).collect();

        self.enter(DrawPhase::Result, &scope.pool);
        tracing::debug!(
            pool = %scope.pool,
            mode = %request.mode,
            selected = selected.len(),
            eligible = eligible.len(),
            "Draw complete"
        );

        Ok(DrawOutcome::Selected(DrawResult {
            scope: scope.clone(),
            mode: request.mode,
            subject: request.subject.clone(),
            selected,
        }))
    }

    /// Uniform animation frame: ignores weights and repeat mode, never persisted.
    pub fn preview<R: Rng + ?Sized>(
        &self,
        scope: &DrawScope,
        candidates: &[Candidate],
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Candidate>> {
        let filtered = Self::filtered(scope, candidates)?;
        Ok(uniform_preview(filtered.len(), count, rng)
            .into_iter()
            .map(|i| filtered[i].clone())
            .collect())
    }

    fn round_of(result: &DrawResult) -> ConfirmedRound {
        ConfirmedRound {
            scope: result.scope.clone(),
            selected: result.selected.clone(),
            subject: result.subject.clone(),
            cycle_limit: result.mode.cycle_limit(),
        }
    }

    /// Record a result the caller has accepted.
    ///
    /// A result made stale by another confirmation of the same scope is refused with
    /// `AlreadyDrawn` and nothing is written.
    pub fn confirm(&self, result: &DrawResult) -> Result<HistoryRecord> {
        self.confirm_at(result, clock::now())
    }

    pub fn confirm_at(&self, result: &DrawResult, now: NaiveDateTime) -> Result<HistoryRecord> {
        let record = self.recorder.record_at(&Self::round_of(result), now)?;
        self.enter(DrawPhase::Recorded, &result.scope.pool);
        self.enter(DrawPhase::Idle, &result.scope.pool);
        Ok(record)
    }

    /// Clear the no-repeat exclusion cycle of one scope. Fairness counters are kept.
    pub fn reset_exclusions(&self, scope: &DrawScope) -> Result<bool> {
        let cleared = self.recorder.clear_cycle(scope)?;
        tracing::info!(pool = %scope.pool, group = %scope.group, gender = %scope.gender, cleared, "Exclusion cycle reset");
        self.enter(DrawPhase::Idle, &scope.pool);
        Ok(cleared)
    }

    /// Wipe every fairness counter and exclusion cycle of a pool.
    pub fn reset_history(&self, pool: &PoolKey) -> Result<()> {
        self.recorder.clear_history(pool)?;
        tracing::info!(pool = %pool, "Pool history reset");
        self.enter(DrawPhase::Idle, pool);
        Ok(())
    }

    /// Draw prizes and, when an assignee side is given, one student or group per prize.
    ///
    /// If either side is exhausted the whole draw asks for that side's reset.
    pub fn draw_paired<R: Rng + ?Sized>(
        &self,
        prizes: (&DrawRequest, &[Candidate]),
        assignees: Option<(&DrawRequest, &[Candidate])>,
        assign_to: Assignee,
        template: DisplayTemplate,
        rng: &mut R,
    ) -> Result<DrawOutcome<PairedDraw>> {
        let (prize_request, prize_pool) = prizes;
        let prize_result = match self.draw(prize_request, prize_pool, rng)? {
            DrawOutcome::Selected(result) => result,
            DrawOutcome::ResetRequired(scope) => return Ok(DrawOutcome::ResetRequired(scope)),
        };

        let Some((request, roster)) = assignees else {
            let assignments = prize_result
                .selected
                .iter()
                .map(|prize| PrizeAssignment::to_student(prize.candidate.clone(), None, template))
                .collect();
            return Ok(DrawOutcome::Selected(PairedDraw {
                prizes: prize_result,
                assign_to,
                students: None,
                assignments,
            }));
        };

        let sized = DrawRequest {
            count: prize_result.selected.len(),
            ..request.clone()
        };
        let members = Self::filtered(&sized.scope, roster)?;
        let side = match assign_to {
            Assignee::Student => self.draw(&sized, roster, rng)?,
            Assignee::Group => {
                let groups = group_candidates(&members);
                let group_request = DrawRequest {
                    scope: DrawScope::whole_pool(PoolKey::groups_of(sized.scope.pool.name.clone())),
                    ..sized.clone()
                };
                self.draw(&group_request, &groups, rng)?
            }
        };
        let side = match side {
            DrawOutcome::Selected(result) => result,
            DrawOutcome::ResetRequired(scope) => return Ok(DrawOutcome::ResetRequired(scope)),
        };

        let mut assignments = Vec::with_capacity(prize_result.selected.len());
        for (i, prize) in prize_result.selected.iter().enumerate() {
            let drawn = side.selected.get(i).map(|w| &w.candidate);
            let assignment = match (assign_to, drawn) {
                (Assignee::Group, Some(group)) => {
                    let in_group: Vec<&Candidate> = members
                        .iter()
                        .copied()
                        .filter(|m| m.group.as_deref() == Some(group.name.as_str()))
                        .collect();
                    let member = in_group.choose(rng).map(|m| (*m).clone());
                    PrizeAssignment::to_group(prize.candidate.clone(), group.name.clone(), member, template)
                }
                (_, student) => PrizeAssignment::to_student(prize.candidate.clone(), student.cloned(), template),
            };
            assignments.push(assignment);
        }

        Ok(DrawOutcome::Selected(PairedDraw {
            prizes: prize_result,
            assign_to,
            students: Some(side),
            assignments,
        }))
    }

    /// Record both sides of a paired draw as one unit.
    pub fn confirm_paired(&self, paired: &PairedDraw) -> Result<()> {
        self.confirm_paired_at(paired, clock::now())
    }

    pub fn confirm_paired_at(&self, paired: &PairedDraw, now: NaiveDateTime) -> Result<()> {
        let mut rounds = vec![Self::round_of(&paired.prizes)];
        if let Some(side) = &paired.students {
            rounds.push(Self::round_of(side));
        }
        self.recorder.record_all_at(&rounds, now)?;
        self.enter(DrawPhase::Recorded, &paired.prizes.scope.pool);
        self.enter(DrawPhase::Idle, &paired.prizes.scope.pool);
        Ok(())
    }
}

/// One candidate per distinct non-empty group among `members`, in roster order.
fn group_candidates(members: &[&Candidate]) -> Vec<Candidate> {
    let mut groups: Vec<Candidate> = Vec::new();
    for group in members.iter().filter_map(|m| m.group.as_deref()).filter(|g| !g.is_empty()) {
        if !groups.iter().any(|c| c.name == group) {
            groups.push(Candidate::new(group, group).with_group(group));
        }
    }
    groups
}
