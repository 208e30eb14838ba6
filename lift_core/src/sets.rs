//! Set logging rules.
//!
//! Pure functions over [`WorkoutSetEntry`] values:
//! - Completion with exercise and rest time derivation
//! - Rolling a completed set back
//! - Dense 1..N renumbering after deletes and moves
//! - RPE rounding

use crate::{ExerciseId, SetId, WorkoutId, WorkoutSetEntry};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// What a completion needs to know besides the set itself
#[derive(Clone, Copy, Debug)]
pub struct CompletionContext<'a> {
    pub now: DateTime<Utc>,
    /// Explicit "start set" time, if the user pressed it
    pub set_start: Option<DateTime<Utc>>,
    /// Start time of the exercise within the workout
    pub exercise_start: Option<DateTime<Utc>>,
    /// All sets currently logged for the (workout, exercise) pair
    pub logged: &'a [WorkoutSetEntry],
}

/// Mark `set` completed at `ctx.now`.
///
/// The set start defaults to `now` when never explicitly started. RPE is
/// kept only if it was locked beforehand.
pub fn complete_set(set: &WorkoutSetEntry, ctx: CompletionContext<'_>) -> WorkoutSetEntry {
    let start = ctx.set_start.unwrap_or(ctx.now);
    let completion = ctx.now;

    let rest = rest_time_secs(set.set_number, start, ctx.exercise_start, ctx.logged);

    WorkoutSetEntry {
        completed: true,
        start_time: Some(start),
        completion_time: Some(completion),
        exercise_time_secs: Some((completion - start).num_seconds()),
        rest_time_secs: rest,
        rpe: if set.rpe_locked { set.rpe } else { None },
        ..set.clone()
    }
}

/// Rest before a set that started at `set_start`.
///
/// Set #1 rests from the exercise start; later sets rest from the completion
/// of the highest-numbered completed set. `None` when the reference point is
/// missing.
pub fn rest_time_secs(
    set_number: u32,
    set_start: DateTime<Utc>,
    exercise_start: Option<DateTime<Utc>>,
    logged: &[WorkoutSetEntry],
) -> Option<i64> {
    if set_number == 1 {
        return exercise_start.map(|t| (set_start - t).num_seconds());
    }

    logged
        .iter()
        .filter(|s| s.completed && s.completion_time.is_some())
        .max_by_key(|s| s.set_number)
        .and_then(|prev| prev.completion_time)
        .map(|t| (set_start - t).num_seconds())
}

/// Full rollback of a completed set
pub fn uncomplete_set(set: &WorkoutSetEntry) -> WorkoutSetEntry {
    WorkoutSetEntry {
        completed: false,
        start_time: None,
        exercise_time_secs: None,
        rest_time_secs: None,
        completion_time: None,
        rpe: None,
        rpe_locked: false,
        ..set.clone()
    }
}

/// Assign set numbers 1..N in the given order
pub fn renumber(sets: Vec<WorkoutSetEntry>) -> Vec<WorkoutSetEntry> {
    sets.into_iter()
        .enumerate()
        .map(|(index, set)| WorkoutSetEntry {
            set_number: index as u32 + 1,
            ..set
        })
        .collect()
}

/// Drop the sets in `ids` and renumber the survivors by their current order
pub fn remove_and_renumber(sets: &[WorkoutSetEntry], ids: &[SetId]) -> Vec<WorkoutSetEntry> {
    let doomed: HashSet<&SetId> = ids.iter().collect();
    let mut survivors: Vec<WorkoutSetEntry> = sets
        .iter()
        .filter(|s| !doomed.contains(&s.id))
        .cloned()
        .collect();
    survivors.sort_by_key(|s| s.set_number);
    renumber(survivors)
}

/// Swap the entries at positions `from` and `to`, then renumber.
/// Returns `None` when either index is out of range.
pub fn move_set(sets: &[WorkoutSetEntry], from: usize, to: usize) -> Option<Vec<WorkoutSetEntry>> {
    if from >= sets.len() || to >= sets.len() {
        return None;
    }
    let mut ordered = sets.to_vec();
    ordered.swap(from, to);
    Some(renumber(ordered))
}

/// `count` new sets numbered after the `existing` ones
pub fn build_sets(
    workout_id: WorkoutId,
    exercise_id: ExerciseId,
    existing: usize,
    count: u32,
    weight_lb: f64,
    reps: u32,
) -> Vec<WorkoutSetEntry> {
    (1..=count)
        .map(|i| WorkoutSetEntry::new(workout_id, exercise_id, existing as u32 + i, weight_lb, reps))
        .collect()
}

/// Round to the nearest half point and clamp to 0..=10
pub fn round_rpe(value: f32) -> f32 {
    ((value * 2.0).round() / 2.0).clamp(0.0, 10.0)
}
