//! Core domain types for the workout log.
//!
//! This module defines the persisted records:
//! - Exercises in the library
//! - Workouts, one per calendar day
//! - The workout/exercise join row with its own start and end times
//! - Logged sets

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ExerciseId = Uuid;
pub type WorkoutId = Uuid;
pub type SetId = Uuid;

// ============================================================================
// Library
// ============================================================================

/// An exercise in the user's library (e.g., "Bench Press" in "Chest")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub notes: String,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            notes: notes.into(),
        }
    }
}

// ============================================================================
// Workouts
// ============================================================================

/// A workout on a given day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: WorkoutId,
    pub date: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Workout {
    /// A fresh, not yet started workout for `date`
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            start_time: None,
            end_time: None,
        }
    }
}

/// Membership of an exercise in a workout, keyed by (workout_id, exercise_id)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExercise {
    pub workout_id: WorkoutId,
    pub exercise_id: ExerciseId,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl WorkoutExercise {
    pub fn new(workout_id: WorkoutId, exercise_id: ExerciseId) -> Self {
        Self {
            workout_id,
            exercise_id,
            start_time: None,
            end_time: None,
        }
    }

    pub fn key(&self) -> (WorkoutId, ExerciseId) {
        (self.workout_id, self.exercise_id)
    }
}

/// A workout joined with the exercises added to it, ordered by name
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutWithExercises {
    pub workout: Workout,
    pub exercises: Vec<Exercise>,
}

// ============================================================================
// Sets
// ============================================================================

/// One logged set of an exercise within a workout.
///
/// Weight is always stored in pounds. Timing fields stay `None` until the
/// set is completed; `exercise_time_secs` and `rest_time_secs` are whole
/// seconds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSetEntry {
    pub id: SetId,
    pub workout_id: WorkoutId,
    pub exercise_id: ExerciseId,
    pub set_number: u32,
    pub weight_lb: f64,
    pub reps: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
    pub rpe: Option<f32>,
    #[serde(default)]
    pub rpe_locked: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub exercise_time_secs: Option<i64>,
    pub rest_time_secs: Option<i64>,
    pub completion_time: Option<DateTime<Utc>>,
}

impl WorkoutSetEntry {
    /// A new, uncompleted set
    pub fn new(
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
        set_number: u32,
        weight_lb: f64,
        reps: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workout_id,
            exercise_id,
            set_number,
            weight_lb,
            reps,
            notes: String::new(),
            completed: false,
            rpe: None,
            rpe_locked: false,
            start_time: None,
            exercise_time_secs: None,
            rest_time_secs: None,
            completion_time: None,
        }
    }
}
