//! CSV export of logged sets.

use crate::store::WorkoutStore;
use crate::{Exercise, Result, WorkoutSetEntry};
use chrono::NaiveDate;
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    exercise: String,
    category: String,
    set_number: u32,
    weight_lb: f64,
    reps: u32,
    completed: bool,
    rpe: Option<f32>,
    start_time: Option<String>,
    completion_time: Option<String>,
    exercise_time_secs: Option<i64>,
    rest_time_secs: Option<i64>,
    notes: String,
}

impl CsvRow {
    fn new(date: NaiveDate, exercise: &Exercise, set: &WorkoutSetEntry) -> Self {
        CsvRow {
            date: date.to_string(),
            exercise: exercise.name.clone(),
            category: exercise.category.clone(),
            set_number: set.set_number,
            weight_lb: set.weight_lb,
            reps: set.reps,
            completed: set.completed,
            rpe: set.rpe,
            start_time: set.start_time.map(|t| t.to_rfc3339()),
            completion_time: set.completion_time.map(|t| t.to_rfc3339()),
            exercise_time_secs: set.exercise_time_secs,
            rest_time_secs: set.rest_time_secs,
            notes: set.notes.clone(),
        }
    }
}

/// Append every set of the workout on `date` to `csv_path`.
///
/// Rows are grouped by exercise name, then set number. Headers are written
/// only when the file is new or empty. Returns the number of rows written.
pub fn export_date(store: &dyn WorkoutStore, date: NaiveDate, csv_path: &Path) -> Result<usize> {
    let Some(joined) = store.watch_workout_for_date(date)?.borrow().clone() else {
        tracing::info!("No workout on {}, nothing to export", date);
        return Ok(0);
    };

    let mut rows = Vec::new();
    for exercise in &joined.exercises {
        for set in store.logged_sets(joined.workout.id, exercise.id)? {
            rows.push(CsvRow::new(date, exercise, &set));
        }
    }
    if rows.is_empty() {
        tracing::info!("Workout on {} has no sets, nothing to export", date);
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(csv_path)?;
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} sets from {} to {:?}", rows.len(), date, csv_path);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::build_sets;
    use crate::store::{add_exercises_to_date, FileStore};
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 22).unwrap()
    }

    fn store_with_sets() -> FileStore {
        let store = FileStore::in_memory();
        let squat = Exercise::new("Squat", "Legs", "");
        let bench = Exercise::new("Bench", "Chest", "");
        store.insert_exercise(squat.clone()).unwrap();
        store.insert_exercise(bench.clone()).unwrap();
        add_exercises_to_date(&store, day(), &[squat.id, bench.id]).unwrap();

        let workout = store.workout_by_date(day()).unwrap().unwrap();
        for set in build_sets(workout.id, squat.id, 0, 3, 225.0, 5) {
            store.insert_set(set).unwrap();
        }
        for set in build_sets(workout.id, bench.id, 0, 2, 185.0, 8) {
            store.insert_set(set).unwrap();
        }
        store
    }

    #[test]
    fn test_export_writes_headers_once() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("out").join("sets.csv");
        let store = store_with_sets();

        assert_eq!(export_date(&store, day(), &csv_path).unwrap(), 5);
        assert_eq!(export_date(&store, day(), &csv_path).unwrap(), 5);

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with("date,exercise,category,set_number"));
        assert_eq!(content.matches("date,exercise").count(), 1);
        // Bench sorts before Squat
        assert!(lines[1].starts_with("2025-08-22,Bench,Chest,1,185.0,8"));
    }

    #[test]
    fn test_export_without_workout() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("sets.csv");
        let store = FileStore::in_memory();

        assert_eq!(export_date(&store, day(), &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }
}
