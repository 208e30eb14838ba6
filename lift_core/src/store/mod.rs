//! Persistence interface and its file-backed implementation.
//!
//! Controllers only talk to [`WorkoutStore`]. Live queries return `watch`
//! receivers that are refreshed after every write.

mod file;
mod live;

pub use file::FileStore;
pub use live::{Live, LiveQueries};

use crate::{
    Error, Exercise, ExerciseId, Result, SetId, Workout, WorkoutExercise, WorkoutId, WorkoutSetEntry,
    WorkoutWithExercises,
};
use chrono::NaiveDate;
use tokio::sync::watch;

/// Storage for the exercise library, workouts and logged sets
pub trait WorkoutStore: Send + Sync {
    /// Insert an exercise, replacing one with the same id
    fn insert_exercise(&self, exercise: Exercise) -> Result<()>;

    /// All exercises ordered by name
    fn watch_exercises(&self) -> Result<Live<Vec<Exercise>>>;

    /// Distinct non-empty categories, sorted
    fn watch_categories(&self) -> Result<Live<Vec<String>>>;

    fn workout_by_date(&self, date: NaiveDate) -> Result<Option<Workout>>;

    /// The workout for `date` joined with its exercises
    fn watch_workout_for_date(&self, date: NaiveDate) -> Result<Live<Option<WorkoutWithExercises>>>;

    /// Insert a workout. Fails if a different workout already owns its date.
    fn insert_workout(&self, workout: Workout) -> Result<WorkoutId>;

    fn update_workout(&self, workout: Workout) -> Result<()>;

    fn insert_set(&self, set: WorkoutSetEntry) -> Result<()>;

    fn update_set(&self, set: WorkoutSetEntry) -> Result<()> {
        self.update_sets(std::slice::from_ref(&set))
    }

    /// Update every set in `sets` that exists; unknown ids are ignored
    fn update_sets(&self, sets: &[WorkoutSetEntry]) -> Result<()>;

    /// Sets for the pair ordered by set number
    fn logged_sets(&self, workout_id: WorkoutId, exercise_id: ExerciseId) -> Result<Vec<WorkoutSetEntry>>;

    fn watch_logged_sets(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
    ) -> Result<Live<Vec<WorkoutSetEntry>>>;

    /// Insert join rows, skipping pairs that already exist. Returns how many
    /// rows were new.
    fn insert_workout_exercises(&self, entries: &[WorkoutExercise]) -> Result<usize>;

    fn delete_workout_exercises(&self, workout_id: WorkoutId, exercise_ids: &[ExerciseId]) -> Result<()>;

    fn delete_sets_by_ids(&self, ids: &[SetId]) -> Result<()>;

    /// Delete `ids` from the pair's sets and renumber the rest 1..N in one
    /// write. Returns how many sets remain.
    fn delete_sets_and_renumber(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
        ids: &[SetId],
    ) -> Result<usize>;

    fn watch_workout_exercise(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
    ) -> Result<Live<Option<WorkoutExercise>>>;

    fn update_workout_exercise(&self, entry: WorkoutExercise) -> Result<()>;

    /// Bumped once per successful write
    fn revisions(&self) -> watch::Receiver<u64>;
}

/// Return the workout for `date`, creating it if absent
pub fn ensure_workout(store: &dyn WorkoutStore, date: NaiveDate) -> Result<Workout> {
    if let Some(workout) = store.workout_by_date(date)? {
        return Ok(workout);
    }
    let workout = Workout::for_date(date);
    match store.insert_workout(workout.clone()) {
        Ok(_) => {
            tracing::info!("Created workout {} for {}", workout.id, date);
            Ok(workout)
        }
        // Another writer created the day's workout first
        Err(Error::Store(reason)) => match store.workout_by_date(date)? {
            Some(existing) => Ok(existing),
            None => Err(Error::Store(reason)),
        },
        Err(e) => Err(e),
    }
}

/// Create the workout for `date` if needed, then add each exercise to it.
/// Pairs that already exist are skipped. Returns how many were new.
pub fn add_exercises_to_date(
    store: &dyn WorkoutStore,
    date: NaiveDate,
    exercise_ids: &[ExerciseId],
) -> Result<usize> {
    let workout = ensure_workout(store, date)?;
    let entries: Vec<WorkoutExercise> = exercise_ids
        .iter()
        .map(|id| WorkoutExercise::new(workout.id, *id))
        .collect();
    let added = store.insert_workout_exercises(&entries)?;
    tracing::info!(
        "Added {} of {} exercises to workout on {}",
        added,
        exercise_ids.len(),
        date
    );
    Ok(added)
}
