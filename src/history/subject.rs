//! Narrowing a pool's history to the rounds drawn under one subject.

use crate::domain::{EntityHistory, HistoryRecord, SubjectTally};

/// View of `record` containing only events recorded under `subject`.
///
/// Per-entity counts, hit counts and last-drawn times are rebuilt from the kept
/// events. Pool tallies come from the subject aggregate, so a subject that was never
/// drawn yields zero tallies. Entities keep their `rounds_missed`, which is not
/// tracked per subject.
pub fn filter_by_subject(record: &HistoryRecord, subject: &str) -> HistoryRecord {
    let entities = record
        .entities
        .iter()
        .map(|(name, entity)| (name.clone(), narrow_entity(entity, subject)))
        .collect();

    let aggregate = record.subject_stats.get(subject).cloned().unwrap_or_default();

    HistoryRecord {
        entities,
        group_stats: aggregate.group_stats.clone(),
        gender_stats: aggregate.gender_stats.clone(),
        subject_stats: record
            .subject_stats
            .get_key_value(subject)
            .map(|(k, v)| (k.clone(), v.clone()))
            .into_iter()
            .collect(),
        total_rounds: aggregate.total_rounds,
        total_selections: aggregate.total_selections,
    }
}

fn narrow_entity(entity: &EntityHistory, subject: &str) -> EntityHistory {
    let history: Vec<_> = entity
        .history
        .iter()
        .filter(|e| e.subject.as_deref() == Some(subject))
        .cloned()
        .collect();

    let group_hit_count = history.iter().filter(|e| e.group_filter.is_some()).count() as u64;
    let gender_hit_count = history.iter().filter(|e| e.gender_filter.is_some()).count() as u64;
    let both = history
        .iter()
        .filter(|e| e.group_filter.is_some() && e.gender_filter.is_some())
        .count() as u64;

    let mut subject_stats = std::collections::BTreeMap::new();
    if !history.is_empty() {
        subject_stats.insert(
            subject.to_string(),
            SubjectTally {
                total_count: history.len() as u64,
                group_gender_count: both,
            },
        );
    }

    EntityHistory {
        total_count: history.len() as u64,
        group_hit_count,
        gender_hit_count,
        last_drawn_time: history.iter().map(|e| e.time).max(),
        rounds_missed: entity.rounds_missed,
        history,
        subject_stats,
    }
}
