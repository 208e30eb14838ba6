//! Built-in starting exercises for a fresh store.

use crate::store::WorkoutStore;
use crate::{Exercise, Result};
use once_cell::sync::Lazy;

/// A library entry before it is given an id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryEntry {
    pub name: &'static str,
    pub category: &'static str,
}

static DEFAULT_LIBRARY: Lazy<Vec<LibraryEntry>> = Lazy::new(|| {
    [
        ("Squat", "Legs"),
        ("Bench", "Chest"),
        ("Deadlift", "Legs"),
        ("Overhead Press", "Shoulders"),
        ("Barbell Row", "Back"),
        ("Pull-up", "Back"),
        ("Barbell Curl", "Arms"),
        ("Plank", "Core"),
    ]
    .into_iter()
    .map(|(name, category)| LibraryEntry { name, category })
    .collect()
});

pub fn default_library() -> &'static [LibraryEntry] {
    &DEFAULT_LIBRARY
}

/// Insert the default exercises when the store has none.
/// Returns how many were inserted.
pub fn seed_library(store: &dyn WorkoutStore) -> Result<usize> {
    if !store.watch_exercises()?.borrow().is_empty() {
        tracing::debug!("Exercise library already populated, not seeding");
        return Ok(0);
    }
    for entry in default_library() {
        store.insert_exercise(Exercise::new(entry.name, entry.category, ""))?;
    }
    tracing::info!("Seeded {} default exercises", default_library().len());
    Ok(default_library().len())
}
