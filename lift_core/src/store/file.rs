//! JSON-file backed store with live queries.
//!
//! All tables live in memory and are written back as one JSON document after
//! every successful write, using the same lock/temp-file/rename sequence for
//! every save so a crash never leaves a half-written file behind.

use super::live::{Live, LiveQueries};
use super::WorkoutStore;
use crate::sets;
use crate::{
    Error, Exercise, ExerciseId, Result, SetId, Workout, WorkoutExercise, WorkoutId,
    WorkoutSetEntry, WorkoutWithExercises,
};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tokio::sync::watch;

// ============================================================================
// Tables
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    exercises: Vec<Exercise>,
    #[serde(default)]
    workouts: Vec<Workout>,
    #[serde(default)]
    workout_exercises: Vec<WorkoutExercise>,
    #[serde(default)]
    sets: Vec<WorkoutSetEntry>,
}

impl Tables {
    fn exercises_by_name(&self) -> Vec<Exercise> {
        let mut exercises = self.exercises.clone();
        exercises.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        exercises
    }

    fn categories(&self) -> Vec<String> {
        self.exercises
            .iter()
            .filter(|e| !e.category.is_empty())
            .map(|e| e.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn workout_by_date(&self, date: NaiveDate) -> Option<Workout> {
        self.workouts.iter().find(|w| w.date == date).cloned()
    }

    fn workout_with_exercises(&self, date: NaiveDate) -> Option<WorkoutWithExercises> {
        let workout = self.workout_by_date(date)?;
        let member_ids: HashSet<ExerciseId> = self
            .workout_exercises
            .iter()
            .filter(|we| we.workout_id == workout.id)
            .map(|we| we.exercise_id)
            .collect();
        let exercises = self
            .exercises_by_name()
            .into_iter()
            .filter(|e| member_ids.contains(&e.id))
            .collect();
        Some(WorkoutWithExercises { workout, exercises })
    }

    fn sets_for(&self, workout_id: WorkoutId, exercise_id: ExerciseId) -> Vec<WorkoutSetEntry> {
        let mut sets: Vec<WorkoutSetEntry> = self
            .sets
            .iter()
            .filter(|s| s.workout_id == workout_id && s.exercise_id == exercise_id)
            .cloned()
            .collect();
        sets.sort_by_key(|s| s.set_number);
        sets
    }

    fn workout_exercise(&self, workout_id: WorkoutId, exercise_id: ExerciseId) -> Option<WorkoutExercise> {
        self.workout_exercises
            .iter()
            .find(|we| we.key() == (workout_id, exercise_id))
            .cloned()
    }

    /// Load tables from a file with shared locking.
    ///
    /// Returns empty tables if the file doesn't exist. A file that cannot be
    /// parsed is renamed to `*.corrupt` and replaced by empty tables.
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No store file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<Tables>(&contents) {
            Ok(tables) => {
                tracing::info!(
                    "Loaded store from {:?}: {} exercises, {} workouts, {} sets",
                    path,
                    tables.exercises.len(),
                    tables.workouts.len(),
                    tables.sets.len()
                );
                Ok(tables)
            }
            Err(e) => {
                let aside = path.with_extension("json.corrupt");
                tracing::warn!(
                    "Failed to parse store file {:?}: {}. Moved to {:?}, starting empty.",
                    path,
                    e,
                    aside
                );
                std::fs::rename(path, &aside)?;
                Ok(Self::default())
            }
        }
    }

    /// Atomically write tables: temp file, exclusive lock, fsync, rename
    fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("store path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }
}

// ============================================================================
// Live query registry
// ============================================================================

#[derive(Default)]
struct LiveSet {
    exercises: LiveQueries<(), Vec<Exercise>>,
    categories: LiveQueries<(), Vec<String>>,
    workout_for_date: LiveQueries<NaiveDate, Option<WorkoutWithExercises>>,
    logged_sets: LiveQueries<(WorkoutId, ExerciseId), Vec<WorkoutSetEntry>>,
    workout_exercise: LiveQueries<(WorkoutId, ExerciseId), Option<WorkoutExercise>>,
}

impl LiveSet {
    fn refresh(&mut self, tables: &Tables) -> usize {
        self.exercises.refresh(|_| tables.exercises_by_name())
            + self.categories.refresh(|_| tables.categories())
            + self
                .workout_for_date
                .refresh(|date| tables.workout_with_exercises(*date))
            + self.logged_sets.refresh(|&(w, e)| tables.sets_for(w, e))
            + self
                .workout_exercise
                .refresh(|&(w, e)| tables.workout_exercise(w, e))
    }
}

struct Inner {
    tables: Tables,
    live: LiveSet,
}

// ============================================================================
// FileStore
// ============================================================================

pub struct FileStore {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
    revision: watch::Sender<u64>,
}

impl FileStore {
    /// Open the store at `path`, loading existing data
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tables = Tables::load(&path)?;
        Ok(Self::with_tables(Some(path), tables))
    }

    /// A store that never touches the disk
    pub fn in_memory() -> Self {
        Self::with_tables(None, Tables::default())
    }

    fn with_tables(path: Option<PathBuf>, tables: Tables) -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            path,
            inner: Mutex::new(Inner {
                tables,
                live: LiveSet::default(),
            }),
            revision,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        let guard = self.inner.lock()?;
        Ok(f(&guard.tables))
    }

    fn subscribe<R>(&self, f: impl FnOnce(&mut LiveSet, &Tables) -> R) -> Result<R> {
        let mut guard = self.inner.lock()?;
        let inner = &mut *guard;
        Ok(f(&mut inner.live, &inner.tables))
    }

    /// Apply `f` to a copy of the tables; commit, persist and notify only if
    /// it succeeds.
    ///
    /// With a backing file, the whole cycle runs under the store's lock file
    /// and starts from what is on disk, so writes from other processes are
    /// never overwritten.
    fn write<R>(&self, what: &str, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let mut guard = self.inner.lock()?;
        let lock = match &self.path {
            Some(path) => {
                let lock = WriteLock::acquire(path)?;
                let inner = &mut *guard;
                inner.tables = Tables::load(path)?;
                let emitted = inner.live.refresh(&inner.tables);
                if emitted > 0 {
                    tracing::debug!("Picked up external changes to {:?}", path);
                }
                Some(lock)
            }
            None => None,
        };

        let mut next = guard.tables.clone();
        let out = f(&mut next)?;

        if let Some(path) = &self.path {
            next.save(path)?;
        }

        let inner = &mut *guard;
        inner.tables = next;
        let emitted = inner.live.refresh(&inner.tables);
        drop(lock);
        drop(guard);

        self.revision.send_modify(|r| *r += 1);
        tracing::debug!("{} committed ({} live queries emitted)", what, emitted);
        Ok(out)
    }
}

/// Exclusive lock on `<store>.lock`, held for one read-modify-save cycle
struct WriteLock {
    file: File,
}

impl WriteLock {
    fn acquire(store_path: &Path) -> Result<Self> {
        let lock_path = store_path.with_extension("json.lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release store lock: {}", e);
        }
    }
}

impl WorkoutStore for FileStore {
    fn insert_exercise(&self, exercise: Exercise) -> Result<()> {
        tracing::info!("Inserting exercise {:?} ({})", exercise.name, exercise.category);
        self.write("insert_exercise", |t| {
            match t.exercises.iter_mut().find(|e| e.id == exercise.id) {
                Some(existing) => *existing = exercise,
                None => t.exercises.push(exercise),
            }
            Ok(())
        })
    }

    fn watch_exercises(&self) -> Result<Live<Vec<Exercise>>> {
        self.subscribe(|live, t| live.exercises.subscribe((), || t.exercises_by_name()))
    }

    fn watch_categories(&self) -> Result<Live<Vec<String>>> {
        self.subscribe(|live, t| live.categories.subscribe((), || t.categories()))
    }

    fn workout_by_date(&self, date: NaiveDate) -> Result<Option<Workout>> {
        self.read(|t| t.workout_by_date(date))
    }

    fn watch_workout_for_date(&self, date: NaiveDate) -> Result<Live<Option<WorkoutWithExercises>>> {
        self.subscribe(|live, t| {
            live.workout_for_date
                .subscribe(date, || t.workout_with_exercises(date))
        })
    }

    fn insert_workout(&self, workout: Workout) -> Result<WorkoutId> {
        self.write("insert_workout", |t| {
            if t.workouts.iter().any(|w| w.date == workout.date && w.id != workout.id) {
                return Err(Error::Store(format!(
                    "a workout already exists for {}",
                    workout.date
                )));
            }
            let id = workout.id;
            match t.workouts.iter_mut().find(|w| w.id == id) {
                Some(existing) => *existing = workout,
                None => t.workouts.push(workout),
            }
            Ok(id)
        })
    }

    fn update_workout(&self, workout: Workout) -> Result<()> {
        self.write("update_workout", |t| {
            if t.workouts.iter().any(|w| w.date == workout.date && w.id != workout.id) {
                return Err(Error::Store(format!(
                    "a workout already exists for {}",
                    workout.date
                )));
            }
            if let Some(existing) = t.workouts.iter_mut().find(|w| w.id == workout.id) {
                *existing = workout;
            }
            Ok(())
        })
    }

    fn insert_set(&self, set: WorkoutSetEntry) -> Result<()> {
        self.write("insert_set", |t| {
            match t.sets.iter_mut().find(|s| s.id == set.id) {
                Some(existing) => *existing = set,
                None => t.sets.push(set),
            }
            Ok(())
        })
    }

    fn update_sets(&self, sets: &[WorkoutSetEntry]) -> Result<()> {
        self.write("update_sets", |t| {
            for set in sets {
                if let Some(existing) = t.sets.iter_mut().find(|s| s.id == set.id) {
                    *existing = set.clone();
                }
            }
            Ok(())
        })
    }

    fn logged_sets(&self, workout_id: WorkoutId, exercise_id: ExerciseId) -> Result<Vec<WorkoutSetEntry>> {
        self.read(|t| t.sets_for(workout_id, exercise_id))
    }

    fn watch_logged_sets(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
    ) -> Result<Live<Vec<WorkoutSetEntry>>> {
        self.subscribe(|live, t| {
            live.logged_sets
                .subscribe((workout_id, exercise_id), || t.sets_for(workout_id, exercise_id))
        })
    }

    fn insert_workout_exercises(&self, entries: &[WorkoutExercise]) -> Result<usize> {
        self.write("insert_workout_exercises", |t| {
            let mut added = 0;
            for entry in entries {
                if t.workout_exercises.iter().any(|we| we.key() == entry.key()) {
                    continue;
                }
                t.workout_exercises.push(entry.clone());
                added += 1;
            }
            Ok(added)
        })
    }

    fn delete_workout_exercises(&self, workout_id: WorkoutId, exercise_ids: &[ExerciseId]) -> Result<()> {
        self.write("delete_workout_exercises", |t| {
            t.workout_exercises
                .retain(|we| !(we.workout_id == workout_id && exercise_ids.contains(&we.exercise_id)));
            Ok(())
        })
    }

    fn delete_sets_by_ids(&self, ids: &[SetId]) -> Result<()> {
        self.write("delete_sets_by_ids", |t| {
            t.sets.retain(|s| !ids.contains(&s.id));
            Ok(())
        })
    }

    fn delete_sets_and_renumber(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
        ids: &[SetId],
    ) -> Result<usize> {
        self.write("delete_sets_and_renumber", |t| {
            let survivors = sets::remove_and_renumber(&t.sets_for(workout_id, exercise_id), ids);
            t.sets.retain(|s| !ids.contains(&s.id));
            for set in &survivors {
                if let Some(existing) = t.sets.iter_mut().find(|s| s.id == set.id) {
                    existing.set_number = set.set_number;
                }
            }
            Ok(survivors.len())
        })
    }

    fn watch_workout_exercise(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
    ) -> Result<Live<Option<WorkoutExercise>>> {
        self.subscribe(|live, t| {
            live.workout_exercise
                .subscribe((workout_id, exercise_id), || t.workout_exercise(workout_id, exercise_id))
        })
    }

    fn update_workout_exercise(&self, entry: WorkoutExercise) -> Result<()> {
        self.write("update_workout_exercise", |t| {
            if let Some(existing) = t.workout_exercises.iter_mut().find(|we| we.key() == entry.key()) {
                *existing = entry;
            }
            Ok(())
        })
    }

    fn revisions(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
