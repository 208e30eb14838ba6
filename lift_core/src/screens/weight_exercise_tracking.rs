//! Logging sets of one exercise within the workout of one day.
//!
//! Slices owned here:
//! - form inputs (tab, weight, reps, set count, display unit, editing ids)
//! - one active confirmation dialog
//! - the explicit "start set" time
//! - the multi-selection of logged sets
//! - the rest countdown and its auto-start flag
//!
//! The workout-exercise row and the logged sets are live queries. Writes go
//! through the store; the view catches up on the next [`Screen::refresh`].

use super::{take_changed, Effect, Screen, ScreenArgs};
use crate::clock::Clock;
use crate::combine::Combiner;
use crate::selection::Selection;
use crate::sets::{self, CompletionContext};
use crate::store::{ensure_workout, Live, WorkoutStore};
use crate::timer::{Countdown, TickOutcome};
use crate::units::{format_weight, parse_weight, WeightUnit};
use crate::{ExerciseId, Result, SetId, Workout, WorkoutExercise, WorkoutSetEntry};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-user defaults for the tracking screen, usually taken from config
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingSettings {
    pub timer_duration_secs: u32,
    pub auto_start: bool,
    pub unit: WeightUnit,
    pub kg_step: f64,
    pub lb_step: f64,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            timer_duration_secs: 60,
            auto_start: false,
            unit: WeightUnit::Kg,
            kg_step: 0.5,
            lb_step: 2.5,
        }
    }
}

/// Confirmation dialogs; at most one is open
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingDialog {
    ResetSetStart,
    ResetExerciseStart,
    ResetExerciseEnd,
    UncheckSet(SetId),
    UnlockRpe(SetId),
}

/// A logged set as shown, with its weight in the display unit
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedSetRow {
    pub entry: WorkoutSetEntry,
    pub display_weight: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerView {
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub running: bool,
    pub auto_start: bool,
    /// Raised when a countdown elapses, until `AlertHandled`
    pub alert: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackingView {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub date: NaiveDate,
    pub workout: Workout,
    pub workout_exercise: Option<WorkoutExercise>,
    pub selected_tab: usize,
    pub weight: String,
    pub reps: String,
    pub sets: String,
    pub unit: WeightUnit,
    pub logged_sets: Vec<LoggedSetRow>,
    pub selection_mode: bool,
    pub selected_ids: BTreeSet<SetId>,
    pub editing_set_id: Option<SetId>,
    pub editing_notes_set_id: Option<SetId>,
    pub editing_notes_text: String,
    pub active_dialog: Option<TrackingDialog>,
    pub current_set_start: Option<DateTime<Utc>>,
    pub timer: TimerView,
    /// Weight and reps parse, so "add sets" is actionable
    pub can_add_sets: bool,
    /// A set is selected for editing and the inputs parse
    pub can_update_set: bool,
}

#[derive(Clone, Debug)]
pub enum TrackingIntent {
    SelectTab(usize),
    WeightChanged(String),
    RepsChanged(String),
    SetsChanged(String),
    ToggleUnit,
    IncrementWeight,
    DecrementWeight,
    IncrementReps,
    DecrementReps,
    IncrementSets,
    DecrementSets,

    StartExercise,
    EndExercise,
    StartSet,
    ShowDialog(TrackingDialog),
    DismissDialog,
    ConfirmDialog,

    AddSets,
    CompleteSet(SetId),
    SelectSetForEditing(SetId),
    UpdateSelectedSet,
    BeginEditNote(SetId),
    NoteTextChanged(String),
    SaveNote,
    ChangeRpe(SetId, f32),
    LockRpe(SetId),

    ToggleSetSelection(SetId),
    ClearSelection,
    DeleteSelected,
    MoveSet { from: usize, to: usize },

    TimerDurationChanged(u32),
    ToggleAutoStart,
    TimerStart,
    TimerReset,
    TimerRepeat,
    AlertHandled,
}

struct Form {
    tab: usize,
    weight: String,
    reps: String,
    sets: String,
    unit: WeightUnit,
    editing_set_id: Option<SetId>,
    notes_set_id: Option<SetId>,
    notes_text: String,
}

impl Form {
    fn weight_lb(&self) -> Option<f64> {
        parse_weight(&self.weight).map(|w| self.unit.to_lb(w))
    }

    fn reps(&self) -> Option<u32> {
        self.reps.trim().parse().ok()
    }

    /// Unparseable counts fall back to one set
    fn set_count(&self) -> u32 {
        self.sets.trim().parse::<u32>().map_or(1, |n| n.max(1))
    }
}

struct Inputs {
    exercise_id: ExerciseId,
    exercise_name: String,
    workout: Workout,
    workout_exercise: Option<WorkoutExercise>,
    logged: Vec<WorkoutSetEntry>,
    form: Form,
    dialog: Option<TrackingDialog>,
    set_start: Option<DateTime<Utc>>,
    selection: Selection<SetId>,
    timer: Countdown,
    auto_start: bool,
}

fn merge(inputs: &Inputs) -> TrackingView {
    let form = &inputs.form;
    let logged_sets = inputs
        .logged
        .iter()
        .map(|entry| LoggedSetRow {
            display_weight: form.unit.from_lb(entry.weight_lb),
            entry: entry.clone(),
        })
        .collect();
    let inputs_parse = form.weight_lb().is_some() && form.reps().is_some();

    TrackingView {
        exercise_id: inputs.exercise_id,
        exercise_name: inputs.exercise_name.clone(),
        date: inputs.workout.date,
        workout: inputs.workout.clone(),
        workout_exercise: inputs.workout_exercise.clone(),
        selected_tab: form.tab,
        weight: form.weight.clone(),
        reps: form.reps.clone(),
        sets: form.sets.clone(),
        unit: form.unit,
        logged_sets,
        selection_mode: inputs.selection.is_selection_mode(),
        selected_ids: inputs.selection.ids().clone(),
        editing_set_id: form.editing_set_id,
        editing_notes_set_id: form.notes_set_id,
        editing_notes_text: form.notes_text.clone(),
        active_dialog: inputs.dialog,
        current_set_start: inputs.set_start,
        timer: TimerView {
            duration_secs: inputs.timer.duration_secs(),
            remaining_secs: inputs.timer.remaining_secs(),
            running: inputs.timer.is_running(),
            auto_start: inputs.auto_start,
            alert: inputs.timer.alert(),
        },
        can_add_sets: inputs_parse,
        can_update_set: inputs_parse && form.editing_set_id.is_some(),
    }
}

fn step_up(text: &str, step: f64) -> String {
    let current = text.trim().parse::<f64>().unwrap_or(0.0);
    format_weight(current + step)
}

fn step_down(text: &str, step: f64) -> String {
    let next = text.trim().parse::<f64>().unwrap_or(0.0) - step;
    if next <= 0.0 {
        String::new()
    } else {
        format_weight(next)
    }
}

fn count_up(text: &str) -> String {
    (text.trim().parse::<i64>().unwrap_or(0) + 1).to_string()
}

fn count_down(text: &str) -> String {
    let next = text.trim().parse::<i64>().unwrap_or(0) - 1;
    if next <= 0 {
        String::new()
    } else {
        next.to_string()
    }
}

pub struct TrackingController {
    store: Arc<dyn WorkoutStore>,
    clock: Arc<dyn Clock>,
    kg_step: f64,
    lb_step: f64,
    workout_exercise_rx: Live<Option<WorkoutExercise>>,
    logged_rx: Live<Vec<WorkoutSetEntry>>,
    state: Combiner<Inputs, TrackingView>,
}

impl TrackingController {
    /// Open from navigation arguments `exerciseId`, `exerciseName` and
    /// `date`. Creates the workout for the date when it does not exist.
    pub fn open(
        store: Arc<dyn WorkoutStore>,
        clock: Arc<dyn Clock>,
        settings: TrackingSettings,
        args: &ScreenArgs,
    ) -> Result<Self> {
        let exercise_id: ExerciseId = args.parse("exerciseId")?;
        let exercise_name = args.require("exerciseName")?.to_string();
        let date: NaiveDate = args.parse("date")?;

        let workout = ensure_workout(store.as_ref(), date)?;
        let mut workout_exercise_rx = store.watch_workout_exercise(workout.id, exercise_id)?;
        let mut logged_rx = store.watch_logged_sets(workout.id, exercise_id)?;
        tracing::debug!("Tracking {} on {}", exercise_name, date);

        let inputs = Inputs {
            exercise_id,
            exercise_name,
            workout,
            workout_exercise: workout_exercise_rx.borrow_and_update().clone(),
            logged: logged_rx.borrow_and_update().clone(),
            form: Form {
                tab: 0,
                weight: "0".to_string(),
                reps: "1".to_string(),
                sets: "1".to_string(),
                unit: settings.unit,
                editing_set_id: None,
                notes_set_id: None,
                notes_text: String::new(),
            },
            dialog: None,
            set_start: None,
            selection: Selection::default(),
            timer: Countdown::new(settings.timer_duration_secs),
            auto_start: settings.auto_start,
        };

        Ok(Self {
            store,
            clock,
            kg_step: settings.kg_step,
            lb_step: settings.lb_step,
            workout_exercise_rx,
            logged_rx,
            state: Combiner::new(inputs, merge),
        })
    }

    pub fn snapshot(&self) -> TrackingView {
        self.state.snapshot()
    }

    /// Sets as currently stored, ordered by set number
    fn stored_sets(&self) -> Result<Vec<WorkoutSetEntry>> {
        let inputs = self.state.inputs();
        self.store.logged_sets(inputs.workout.id, inputs.exercise_id)
    }

    fn find_set(&self, id: SetId) -> Result<Option<WorkoutSetEntry>> {
        Ok(self.stored_sets()?.into_iter().find(|s| s.id == id))
    }

    /// Apply `f` to a stored set and write it back; missing sets are ignored
    fn edit_set(&self, id: SetId, f: impl FnOnce(&WorkoutSetEntry) -> Option<WorkoutSetEntry>) -> Result<()> {
        if let Some(updated) = self.find_set(id)?.as_ref().and_then(f) {
            self.store.update_set(updated)?;
        }
        Ok(())
    }

    fn edit_workout_exercise(&self, f: impl FnOnce(&mut WorkoutExercise)) -> Result<()> {
        let Some(mut entry) = self.state.inputs().workout_exercise.clone() else {
            return Ok(());
        };
        f(&mut entry);
        self.store.update_workout_exercise(entry)
    }

    fn reset_timer(&mut self) {
        if self.state.inputs().timer.is_running() {
            self.state.update(|s| s.timer.reset());
        }
    }

    fn start_timer(&mut self) -> Vec<Effect> {
        self.state
            .update(|s| s.timer.start())
            .map(Effect::StartTicker)
            .into_iter()
            .collect()
    }

    /// Cancel any running countdown and start a fresh one
    fn restart_timer(&mut self) -> Vec<Effect> {
        self.state
            .update(|s| s.timer.repeat())
            .map(Effect::StartTicker)
            .into_iter()
            .collect()
    }

    fn toggle_unit(&mut self) {
        self.state.update(|s| {
            let from = s.form.unit;
            let to = from.toggled();
            if let Some(value) = parse_weight(&s.form.weight) {
                s.form.weight = format_weight(to.from_lb(from.to_lb(value)));
            }
            s.form.unit = to;
        });
    }

    fn weight_step(&self) -> f64 {
        match self.state.inputs().form.unit {
            WeightUnit::Kg => self.kg_step,
            WeightUnit::Lb => self.lb_step,
        }
    }

    fn add_sets(&mut self) -> Result<()> {
        self.reset_timer();
        let inputs = self.state.inputs();
        let (Some(weight_lb), Some(reps)) = (inputs.form.weight_lb(), inputs.form.reps()) else {
            return Ok(());
        };
        let count = inputs.form.set_count();
        let existing = self.stored_sets()?.len();
        let new_sets = sets::build_sets(
            inputs.workout.id,
            inputs.exercise_id,
            existing,
            count,
            weight_lb,
            reps,
        );
        tracing::info!(
            "Adding {} sets of {} x {} lb to {}",
            count,
            reps,
            weight_lb,
            inputs.exercise_name
        );
        for set in new_sets {
            self.store.insert_set(set)?;
        }
        Ok(())
    }

    fn complete_set(&mut self, id: SetId) -> Result<Vec<Effect>> {
        let logged = self.stored_sets()?;
        let Some(set) = logged.iter().find(|s| s.id == id && !s.completed) else {
            return Ok(Vec::new());
        };
        let inputs = self.state.inputs();
        let done = sets::complete_set(
            set,
            CompletionContext {
                now: self.clock.now(),
                set_start: inputs.set_start,
                exercise_start: inputs.workout_exercise.as_ref().and_then(|e| e.start_time),
                logged: &logged,
            },
        );
        tracing::info!(
            "Completed set {} of {} (rest {:?}s)",
            done.set_number,
            inputs.exercise_name,
            done.rest_time_secs
        );
        self.store.update_set(done)?;

        self.state.update(|s| s.set_start = None);
        if self.state.inputs().auto_start {
            return Ok(self.restart_timer());
        }
        Ok(Vec::new())
    }

    fn select_for_editing(&mut self, id: SetId) {
        if self.state.inputs().form.editing_set_id == Some(id) {
            self.state.update(|s| s.form.editing_set_id = None);
            return;
        }
        self.state.update(|s| {
            let Some(set) = s.logged.iter().find(|set| set.id == id) else {
                return;
            };
            s.form.weight = format_weight(s.form.unit.from_lb(set.weight_lb));
            s.form.reps = set.reps.to_string();
            s.form.editing_set_id = Some(id);
        });
    }

    fn update_selected_set(&mut self) -> Result<()> {
        self.reset_timer();
        let form = &self.state.inputs().form;
        let (Some(id), Some(weight_lb), Some(reps)) = (form.editing_set_id, form.weight_lb(), form.reps())
        else {
            return Ok(());
        };
        self.edit_set(id, |set| {
            Some(WorkoutSetEntry {
                weight_lb,
                reps,
                ..set.clone()
            })
        })?;
        self.state.update(|s| s.form.editing_set_id = None);
        Ok(())
    }

    fn save_note(&mut self) -> Result<()> {
        let form = &self.state.inputs().form;
        if let Some(id) = form.notes_set_id {
            let notes = form.notes_text.clone();
            self.edit_set(id, |set| {
                Some(WorkoutSetEntry {
                    notes,
                    ..set.clone()
                })
            })?;
        }
        self.state.update(|s| {
            s.form.notes_set_id = None;
            s.form.notes_text.clear();
        });
        Ok(())
    }

    fn confirm_dialog(&mut self) -> Result<()> {
        let Some(dialog) = self.state.inputs().dialog else {
            return Ok(());
        };
        match dialog {
            TrackingDialog::ResetSetStart => self.state.update(|s| s.set_start = None),
            TrackingDialog::ResetExerciseStart => self.edit_workout_exercise(|e| {
                e.start_time = None;
                e.end_time = None;
            })?,
            TrackingDialog::ResetExerciseEnd => self.edit_workout_exercise(|e| e.end_time = None)?,
            TrackingDialog::UncheckSet(id) => {
                self.edit_set(id, |set| Some(sets::uncomplete_set(set)))?
            }
            TrackingDialog::UnlockRpe(id) => self.edit_set(id, |set| {
                Some(WorkoutSetEntry {
                    rpe_locked: false,
                    ..set.clone()
                })
            })?,
        }
        self.state.update(|s| s.dialog = None);
        Ok(())
    }

    fn delete_selected(&mut self) -> Result<()> {
        let ids = self.state.inputs().selection.to_vec();
        if !ids.is_empty() {
            let inputs = self.state.inputs();
            let remaining =
                self.store
                    .delete_sets_and_renumber(inputs.workout.id, inputs.exercise_id, &ids)?;
            tracing::info!("Deleted {} sets, {} remain", ids.len(), remaining);
        }
        self.state.update(|s| {
            if s.form.editing_set_id.map_or(false, |id| ids.contains(&id)) {
                s.form.editing_set_id = None;
            }
            s.selection.clear();
        });
        Ok(())
    }

    fn move_set(&mut self, from: usize, to: usize) -> Result<()> {
        if let Some(reordered) = sets::move_set(&self.stored_sets()?, from, to) {
            self.store.update_sets(&reordered)?;
        }
        Ok(())
    }
}

impl Screen for TrackingController {
    type Intent = TrackingIntent;
    type View = TrackingView;

    fn dispatch(&mut self, intent: TrackingIntent) -> Result<Vec<Effect>> {
        // Completion needs the latest exercise start time
        self.refresh();
        let mut effects = Vec::new();
        match intent {
            TrackingIntent::SelectTab(tab) => self.state.update(|s| s.form.tab = tab),
            TrackingIntent::WeightChanged(text) => self.state.update(|s| s.form.weight = text),
            TrackingIntent::RepsChanged(text) => self.state.update(|s| s.form.reps = text),
            TrackingIntent::SetsChanged(text) => self.state.update(|s| s.form.sets = text),
            TrackingIntent::ToggleUnit => self.toggle_unit(),
            TrackingIntent::IncrementWeight => {
                let step = self.weight_step();
                self.state.update(|s| s.form.weight = step_up(&s.form.weight, step))
            }
            TrackingIntent::DecrementWeight => {
                let step = self.weight_step();
                self.state.update(|s| s.form.weight = step_down(&s.form.weight, step))
            }
            TrackingIntent::IncrementReps => self.state.update(|s| s.form.reps = count_up(&s.form.reps)),
            TrackingIntent::DecrementReps => {
                self.state.update(|s| s.form.reps = count_down(&s.form.reps))
            }
            TrackingIntent::IncrementSets => self.state.update(|s| s.form.sets = count_up(&s.form.sets)),
            TrackingIntent::DecrementSets => {
                self.state.update(|s| s.form.sets = count_down(&s.form.sets))
            }

            TrackingIntent::StartExercise => {
                let now = self.clock.now();
                self.edit_workout_exercise(|e| e.start_time = Some(now))?
            }
            TrackingIntent::EndExercise => {
                let now = self.clock.now();
                self.edit_workout_exercise(|e| e.end_time = Some(now))?
            }
            TrackingIntent::StartSet => {
                self.reset_timer();
                let now = self.clock.now();
                self.state.update(|s| s.set_start = Some(now));
            }
            TrackingIntent::ShowDialog(dialog) => self.state.update(|s| s.dialog = Some(dialog)),
            TrackingIntent::DismissDialog => self.state.update(|s| s.dialog = None),
            TrackingIntent::ConfirmDialog => self.confirm_dialog()?,

            TrackingIntent::AddSets => self.add_sets()?,
            TrackingIntent::CompleteSet(id) => effects = self.complete_set(id)?,
            TrackingIntent::SelectSetForEditing(id) => self.select_for_editing(id),
            TrackingIntent::UpdateSelectedSet => self.update_selected_set()?,
            TrackingIntent::BeginEditNote(id) => self.state.update(|s| {
                if let Some(set) = s.logged.iter().find(|set| set.id == id) {
                    s.form.notes_text = set.notes.clone();
                    s.form.notes_set_id = Some(id);
                }
            }),
            TrackingIntent::NoteTextChanged(text) => self.state.update(|s| s.form.notes_text = text),
            TrackingIntent::SaveNote => self.save_note()?,
            TrackingIntent::ChangeRpe(id, value) => self.edit_set(id, |set| {
                if set.rpe_locked {
                    return None;
                }
                Some(WorkoutSetEntry {
                    rpe: Some(sets::round_rpe(value)),
                    ..set.clone()
                })
            })?,
            TrackingIntent::LockRpe(id) => self.edit_set(id, |set| {
                Some(WorkoutSetEntry {
                    rpe_locked: true,
                    ..set.clone()
                })
            })?,

            TrackingIntent::ToggleSetSelection(id) => self.state.update(|s| s.selection.toggle(id)),
            TrackingIntent::ClearSelection => self.state.update(|s| s.selection.clear()),
            TrackingIntent::DeleteSelected => self.delete_selected()?,
            TrackingIntent::MoveSet { from, to } => self.move_set(from, to)?,

            TrackingIntent::TimerDurationChanged(secs) => {
                let changed = self.state.update(|s| s.timer.set_duration(secs));
                if !changed {
                    tracing::debug!("Ignoring timer duration change to {}s", secs);
                }
            }
            TrackingIntent::ToggleAutoStart => self.state.update(|s| s.auto_start = !s.auto_start),
            TrackingIntent::TimerStart => effects = self.start_timer(),
            TrackingIntent::TimerReset => self.state.update(|s| s.timer.reset()),
            TrackingIntent::TimerRepeat => effects = self.restart_timer(),
            TrackingIntent::AlertHandled => self.state.update(|s| s.timer.acknowledge_alert()),
        }
        self.refresh();
        Ok(effects)
    }

    fn refresh(&mut self) -> bool {
        let workout_exercise = take_changed(&mut self.workout_exercise_rx);
        let logged = take_changed(&mut self.logged_rx);
        if workout_exercise.is_none() && logged.is_none() {
            return false;
        }
        self.state.update(|s| {
            if let Some(entry) = workout_exercise {
                s.workout_exercise = entry;
            }
            if let Some(logged) = logged {
                s.logged = logged;
            }
        });
        true
    }

    fn on_tick(&mut self, generation: u64) -> Vec<Effect> {
        if self.state.inputs().timer.is_running() {
            if let TickOutcome::Elapsed = self.state.update(|s| s.timer.tick(generation)) {
                tracing::debug!("Rest timer elapsed");
            }
        }
        Vec::new()
    }

    fn subscribe(&self) -> watch::Receiver<TrackingView> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{add_exercises_to_date, FileStore};
    use crate::{Error, Exercise, WorkoutId, WorkoutWithExercises};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        store: Arc<FileStore>,
        clock: Arc<ManualClock>,
        exercise: Exercise,
        screen: TrackingController,
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 22).unwrap()
    }

    fn args(exercise: &Exercise) -> ScreenArgs {
        ScreenArgs::new()
            .with("exerciseId", exercise.id)
            .with("exerciseName", &exercise.name)
            .with("date", day())
    }

    fn fixture_with(settings: TrackingSettings) -> Fixture {
        let store = Arc::new(FileStore::in_memory());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 8, 22, 18, 0, 0).unwrap(),
        ));
        let exercise = Exercise::new("Bench Press", "Chest", "");
        store.insert_exercise(exercise.clone()).unwrap();
        add_exercises_to_date(store.as_ref(), day(), &[exercise.id]).unwrap();
        let screen =
            TrackingController::open(store.clone(), clock.clone(), settings, &args(&exercise)).unwrap();
        Fixture {
            store,
            clock,
            exercise,
            screen,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(TrackingSettings::default())
    }

    fn add_sets(f: &mut Fixture, weight: &str, reps: &str, count: &str) {
        f.screen.dispatch(TrackingIntent::WeightChanged(weight.into())).unwrap();
        f.screen.dispatch(TrackingIntent::RepsChanged(reps.into())).unwrap();
        f.screen.dispatch(TrackingIntent::SetsChanged(count.into())).unwrap();
        f.screen.dispatch(TrackingIntent::AddSets).unwrap();
    }

    fn set_ids(f: &Fixture) -> Vec<SetId> {
        f.screen.snapshot().logged_sets.iter().map(|r| r.entry.id).collect()
    }

    #[test]
    fn test_open_requires_navigation_arguments() {
        let store = Arc::new(FileStore::in_memory());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let args = ScreenArgs::new().with("exerciseName", "Squat").with("date", day());
        let result = TrackingController::open(store, clock, TrackingSettings::default(), &args);
        assert!(matches!(result, Err(Error::MissingArgument("exerciseId"))));
    }

    #[test]
    fn test_open_creates_workout_when_absent() {
        let store = Arc::new(FileStore::in_memory());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let exercise = Exercise::new("Squat", "Legs", "");

        let screen =
            TrackingController::open(store.clone(), clock, TrackingSettings::default(), &args(&exercise))
                .unwrap();

        let workout = store.workout_by_date(day()).unwrap().unwrap();
        let view = screen.snapshot();
        assert_eq!(view.workout.id, workout.id);
        assert_eq!(view.weight, "0");
        assert_eq!(view.reps, "1");
        assert_eq!(view.sets, "1");
        assert_eq!(view.timer.remaining_secs, 60);
    }

    #[test]
    fn test_add_sets_stores_pounds() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "3");

        let view = f.screen.snapshot();
        assert_eq!(view.logged_sets.len(), 3);
        let numbers: Vec<u32> = view.logged_sets.iter().map(|r| r.entry.set_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(view.logged_sets.iter().all(|r| r.entry.weight_lb == 220.5));
        assert!(view.logged_sets.iter().all(|r| r.display_weight == 100.0));

        // Numbering continues after existing sets
        add_sets(&mut f, "100", "5", "x");
        let numbers: Vec<u32> = f
            .screen
            .snapshot()
            .logged_sets
            .iter()
            .map(|r| r.entry.set_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_malformed_input_blocks_add() {
        let mut f = fixture();
        f.screen.dispatch(TrackingIntent::WeightChanged("heavy".into())).unwrap();
        assert!(!f.screen.snapshot().can_add_sets);

        f.screen.dispatch(TrackingIntent::AddSets).unwrap();
        assert!(f.screen.snapshot().logged_sets.is_empty());

        f.screen.dispatch(TrackingIntent::WeightChanged("60".into())).unwrap();
        f.screen.dispatch(TrackingIntent::RepsChanged("".into())).unwrap();
        assert!(!f.screen.snapshot().can_add_sets);
    }

    #[test]
    fn test_complete_first_set_derives_times() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "2");
        let ids = set_ids(&f);

        f.screen.dispatch(TrackingIntent::StartExercise).unwrap();
        f.clock.advance(Duration::seconds(45));
        f.screen.dispatch(TrackingIntent::StartSet).unwrap();
        f.clock.advance(Duration::seconds(30));
        f.screen.dispatch(TrackingIntent::CompleteSet(ids[0])).unwrap();

        let view = f.screen.snapshot();
        let first = &view.logged_sets[0].entry;
        assert!(first.completed);
        assert_eq!(first.rest_time_secs, Some(45));
        assert_eq!(first.exercise_time_secs, Some(30));
        assert_eq!(view.current_set_start, None);

        // Second set without "start set" starts at completion time
        f.clock.advance(Duration::seconds(90));
        f.screen.dispatch(TrackingIntent::CompleteSet(ids[1])).unwrap();
        let second = f.screen.snapshot().logged_sets[1].entry.clone();
        assert_eq!(second.exercise_time_secs, Some(0));
        assert_eq!(second.rest_time_secs, Some(90));
    }

    #[test]
    fn test_complete_unknown_set_is_noop() {
        let mut f = fixture();
        let effects = f.screen.dispatch(TrackingIntent::CompleteSet(uuid::Uuid::new_v4())).unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn test_auto_start_runs_timer_after_completion() {
        let mut f = fixture_with(TrackingSettings {
            auto_start: true,
            ..TrackingSettings::default()
        });
        add_sets(&mut f, "40", "10", "1");
        let ids = set_ids(&f);

        let effects = f.screen.dispatch(TrackingIntent::CompleteSet(ids[0])).unwrap();

        assert!(matches!(effects.as_slice(), [Effect::StartTicker(_)]));
        assert!(f.screen.snapshot().timer.running);
    }

    #[test]
    fn test_auto_start_restarts_running_countdown() {
        let mut f = fixture_with(TrackingSettings {
            auto_start: true,
            ..TrackingSettings::default()
        });
        add_sets(&mut f, "40", "10", "2");
        let ids = set_ids(&f);

        let effects = f.screen.dispatch(TrackingIntent::CompleteSet(ids[0])).unwrap();
        let Some(Effect::StartTicker(first)) = effects.into_iter().next() else {
            panic!("expected a ticker");
        };
        for _ in 0..20 {
            f.screen.on_tick(first.generation);
        }
        assert_eq!(f.screen.snapshot().timer.remaining_secs, 40);

        let effects = f.screen.dispatch(TrackingIntent::CompleteSet(ids[1])).unwrap();
        let Some(Effect::StartTicker(second)) = effects.into_iter().next() else {
            panic!("expected a fresh ticker");
        };
        assert_ne!(second.generation, first.generation);
        assert!(first.token.is_cancelled());
        let timer = f.screen.snapshot().timer;
        assert!(timer.running);
        assert_eq!(timer.remaining_secs, 60);

        // The first run's ticker no longer counts
        f.screen.on_tick(first.generation);
        assert_eq!(f.screen.snapshot().timer.remaining_secs, 60);
    }

    #[test]
    fn test_starting_set_resets_running_timer() {
        let mut f = fixture();
        f.screen.dispatch(TrackingIntent::TimerDurationChanged(90)).unwrap();
        let effects = f.screen.dispatch(TrackingIntent::TimerStart).unwrap();
        let Some(Effect::StartTicker(lease)) = effects.into_iter().next() else {
            panic!("expected a ticker");
        };
        f.screen.on_tick(lease.generation);
        f.screen.on_tick(lease.generation);
        assert_eq!(f.screen.snapshot().timer.remaining_secs, 88);

        f.screen.dispatch(TrackingIntent::StartSet).unwrap();

        let timer = f.screen.snapshot().timer;
        assert!(!timer.running);
        assert_eq!(timer.remaining_secs, 90);
        assert!(lease.token.is_cancelled());
    }

    #[test]
    fn test_timer_elapses_and_raises_alert() {
        let mut f = fixture();
        f.screen.dispatch(TrackingIntent::TimerDurationChanged(2)).unwrap();
        let effects = f.screen.dispatch(TrackingIntent::TimerStart).unwrap();
        let Some(Effect::StartTicker(lease)) = effects.into_iter().next() else {
            panic!("expected a ticker");
        };

        // Duration is locked while running
        f.screen.dispatch(TrackingIntent::TimerDurationChanged(30)).unwrap();
        assert_eq!(f.screen.snapshot().timer.duration_secs, 2);

        f.screen.on_tick(lease.generation);
        f.screen.on_tick(lease.generation);
        let timer = f.screen.snapshot().timer;
        assert!(timer.alert);
        assert!(!timer.running);
        assert_eq!(timer.remaining_secs, 2);

        f.screen.dispatch(TrackingIntent::AlertHandled).unwrap();
        assert!(!f.screen.snapshot().timer.alert);
    }

    #[test]
    fn test_toggle_unit_converts_input_and_rows() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "1");

        f.screen.dispatch(TrackingIntent::ToggleUnit).unwrap();
        let view = f.screen.snapshot();
        assert_eq!(view.unit, WeightUnit::Lb);
        assert_eq!(view.weight, "220.5");
        assert_eq!(view.logged_sets[0].display_weight, 220.5);

        f.screen.dispatch(TrackingIntent::ToggleUnit).unwrap();
        assert_eq!(f.screen.snapshot().weight, "100.0");
    }

    #[test]
    fn test_weight_steps_follow_unit() {
        let mut f = fixture();
        f.screen.dispatch(TrackingIntent::IncrementWeight).unwrap();
        assert_eq!(f.screen.snapshot().weight, "0.5");
        f.screen.dispatch(TrackingIntent::DecrementWeight).unwrap();
        assert_eq!(f.screen.snapshot().weight, "");

        f.screen.dispatch(TrackingIntent::ToggleUnit).unwrap();
        f.screen.dispatch(TrackingIntent::IncrementWeight).unwrap();
        f.screen.dispatch(TrackingIntent::IncrementWeight).unwrap();
        assert_eq!(f.screen.snapshot().weight, "5.0");

        f.screen.dispatch(TrackingIntent::DecrementReps).unwrap();
        assert_eq!(f.screen.snapshot().reps, "");
        f.screen.dispatch(TrackingIntent::IncrementReps).unwrap();
        f.screen.dispatch(TrackingIntent::IncrementSets).unwrap();
        let view = f.screen.snapshot();
        assert_eq!(view.reps, "1");
        assert_eq!(view.sets, "2");
    }

    #[test]
    fn test_edit_selected_set() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "2");
        let ids = set_ids(&f);
        f.screen.dispatch(TrackingIntent::WeightChanged("10".into())).unwrap();

        f.screen.dispatch(TrackingIntent::SelectSetForEditing(ids[1])).unwrap();
        let view = f.screen.snapshot();
        assert_eq!(view.editing_set_id, Some(ids[1]));
        assert_eq!(view.weight, "100.0");
        assert!(view.can_update_set);

        // Deselecting keeps the inputs
        f.screen.dispatch(TrackingIntent::SelectSetForEditing(ids[1])).unwrap();
        let view = f.screen.snapshot();
        assert_eq!(view.editing_set_id, None);
        assert_eq!(view.weight, "100.0");

        f.screen.dispatch(TrackingIntent::SelectSetForEditing(ids[1])).unwrap();
        f.screen.dispatch(TrackingIntent::RepsChanged("3".into())).unwrap();
        f.screen.dispatch(TrackingIntent::UpdateSelectedSet).unwrap();

        let view = f.screen.snapshot();
        assert_eq!(view.editing_set_id, None);
        assert_eq!(view.logged_sets[1].entry.reps, 3);
        assert_eq!(view.logged_sets[0].entry.reps, 5);
    }

    #[test]
    fn test_delete_middle_set_renumbers() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "3");
        let ids = set_ids(&f);

        f.screen.dispatch(TrackingIntent::ToggleSetSelection(ids[1])).unwrap();
        assert!(f.screen.snapshot().selection_mode);
        f.screen.dispatch(TrackingIntent::DeleteSelected).unwrap();

        let view = f.screen.snapshot();
        assert!(!view.selection_mode);
        let remaining: Vec<(SetId, u32)> = view
            .logged_sets
            .iter()
            .map(|r| (r.entry.id, r.entry.set_number))
            .collect();
        assert_eq!(remaining, vec![(ids[0], 1), (ids[2], 2)]);
    }

    /// Store whose batch set updates always fail
    struct BatchUpdatesFail {
        inner: FileStore,
    }

    impl WorkoutStore for BatchUpdatesFail {
        fn insert_exercise(&self, exercise: Exercise) -> Result<()> {
            self.inner.insert_exercise(exercise)
        }
        fn watch_exercises(&self) -> Result<Live<Vec<Exercise>>> {
            self.inner.watch_exercises()
        }
        fn watch_categories(&self) -> Result<Live<Vec<String>>> {
            self.inner.watch_categories()
        }
        fn workout_by_date(&self, date: NaiveDate) -> Result<Option<Workout>> {
            self.inner.workout_by_date(date)
        }
        fn watch_workout_for_date(
            &self,
            date: NaiveDate,
        ) -> Result<Live<Option<WorkoutWithExercises>>> {
            self.inner.watch_workout_for_date(date)
        }
        fn insert_workout(&self, workout: Workout) -> Result<WorkoutId> {
            self.inner.insert_workout(workout)
        }
        fn update_workout(&self, workout: Workout) -> Result<()> {
            self.inner.update_workout(workout)
        }
        fn insert_set(&self, set: WorkoutSetEntry) -> Result<()> {
            self.inner.insert_set(set)
        }
        fn update_sets(&self, _sets: &[WorkoutSetEntry]) -> Result<()> {
            Err(Error::Store("batch update rejected".into()))
        }
        fn logged_sets(&self, workout_id: WorkoutId, exercise_id: ExerciseId) -> Result<Vec<WorkoutSetEntry>> {
            self.inner.logged_sets(workout_id, exercise_id)
        }
        fn watch_logged_sets(
            &self,
            workout_id: WorkoutId,
            exercise_id: ExerciseId,
        ) -> Result<Live<Vec<WorkoutSetEntry>>> {
            self.inner.watch_logged_sets(workout_id, exercise_id)
        }
        fn insert_workout_exercises(&self, entries: &[WorkoutExercise]) -> Result<usize> {
            self.inner.insert_workout_exercises(entries)
        }
        fn delete_workout_exercises(&self, workout_id: WorkoutId, exercise_ids: &[ExerciseId]) -> Result<()> {
            self.inner.delete_workout_exercises(workout_id, exercise_ids)
        }
        fn delete_sets_by_ids(&self, ids: &[SetId]) -> Result<()> {
            self.inner.delete_sets_by_ids(ids)
        }
        fn delete_sets_and_renumber(
            &self,
            workout_id: WorkoutId,
            exercise_id: ExerciseId,
            ids: &[SetId],
        ) -> Result<usize> {
            self.inner.delete_sets_and_renumber(workout_id, exercise_id, ids)
        }
        fn watch_workout_exercise(
            &self,
            workout_id: WorkoutId,
            exercise_id: ExerciseId,
        ) -> Result<Live<Option<WorkoutExercise>>> {
            self.inner.watch_workout_exercise(workout_id, exercise_id)
        }
        fn update_workout_exercise(&self, entry: WorkoutExercise) -> Result<()> {
            self.inner.update_workout_exercise(entry)
        }
        fn revisions(&self) -> tokio::sync::watch::Receiver<u64> {
            self.inner.revisions()
        }
    }

    #[test]
    fn test_delete_keeps_numbers_dense_without_batch_updates() {
        let store = Arc::new(BatchUpdatesFail {
            inner: FileStore::in_memory(),
        });
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let exercise = Exercise::new("Pendlay Row", "Back", "");
        store.insert_exercise(exercise.clone()).unwrap();
        add_exercises_to_date(store.as_ref(), day(), &[exercise.id]).unwrap();
        let mut screen =
            TrackingController::open(store.clone(), clock, TrackingSettings::default(), &args(&exercise))
                .unwrap();
        screen.dispatch(TrackingIntent::WeightChanged("80".into())).unwrap();
        screen.dispatch(TrackingIntent::RepsChanged("6".into())).unwrap();
        screen.dispatch(TrackingIntent::SetsChanged("4".into())).unwrap();
        screen.dispatch(TrackingIntent::AddSets).unwrap();
        let ids: Vec<SetId> = screen.snapshot().logged_sets.iter().map(|r| r.entry.id).collect();

        screen.dispatch(TrackingIntent::ToggleSetSelection(ids[0])).unwrap();
        screen.dispatch(TrackingIntent::ToggleSetSelection(ids[2])).unwrap();
        screen.dispatch(TrackingIntent::DeleteSelected).unwrap();

        let workout = store.workout_by_date(day()).unwrap().unwrap();
        let stored: Vec<(SetId, u32)> = store
            .logged_sets(workout.id, exercise.id)
            .unwrap()
            .iter()
            .map(|s| (s.id, s.set_number))
            .collect();
        assert_eq!(stored, vec![(ids[1], 1), (ids[3], 2)]);
    }

    #[test]
    fn test_move_set_swaps_positions() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "3");
        let ids = set_ids(&f);

        f.screen.dispatch(TrackingIntent::MoveSet { from: 0, to: 1 }).unwrap();
        assert_eq!(set_ids(&f), vec![ids[1], ids[0], ids[2]]);

        f.screen.dispatch(TrackingIntent::MoveSet { from: 2, to: 5 }).unwrap();
        assert_eq!(set_ids(&f), vec![ids[1], ids[0], ids[2]]);
    }

    #[test]
    fn test_rpe_rounding_and_lock() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "1");
        let id = set_ids(&f)[0];

        f.screen.dispatch(TrackingIntent::ChangeRpe(id, 7.8)).unwrap();
        assert_eq!(f.screen.snapshot().logged_sets[0].entry.rpe, Some(8.0));

        f.screen.dispatch(TrackingIntent::LockRpe(id)).unwrap();
        f.screen.dispatch(TrackingIntent::ChangeRpe(id, 6.0)).unwrap();
        assert_eq!(f.screen.snapshot().logged_sets[0].entry.rpe, Some(8.0));

        // Locked RPE survives completion
        f.screen.dispatch(TrackingIntent::CompleteSet(id)).unwrap();
        assert_eq!(f.screen.snapshot().logged_sets[0].entry.rpe, Some(8.0));

        f.screen
            .dispatch(TrackingIntent::ShowDialog(TrackingDialog::UnlockRpe(id)))
            .unwrap();
        f.screen.dispatch(TrackingIntent::ConfirmDialog).unwrap();
        let view = f.screen.snapshot();
        assert!(!view.logged_sets[0].entry.rpe_locked);
        assert_eq!(view.active_dialog, None);
    }

    #[test]
    fn test_uncheck_through_dialog_rolls_back() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "1");
        let id = set_ids(&f)[0];
        f.screen.dispatch(TrackingIntent::CompleteSet(id)).unwrap();
        assert!(f.screen.snapshot().logged_sets[0].entry.completed);

        f.screen
            .dispatch(TrackingIntent::ShowDialog(TrackingDialog::UncheckSet(id)))
            .unwrap();
        f.screen.dispatch(TrackingIntent::DismissDialog).unwrap();
        assert!(f.screen.snapshot().logged_sets[0].entry.completed);

        f.screen
            .dispatch(TrackingIntent::ShowDialog(TrackingDialog::UncheckSet(id)))
            .unwrap();
        f.screen.dispatch(TrackingIntent::ConfirmDialog).unwrap();
        let entry = f.screen.snapshot().logged_sets[0].entry.clone();
        assert!(!entry.completed);
        assert_eq!(entry.completion_time, None);
        assert_eq!(entry.exercise_time_secs, None);
    }

    #[test]
    fn test_exercise_start_reset_clears_both_times() {
        let mut f = fixture();
        f.screen.dispatch(TrackingIntent::StartExercise).unwrap();
        f.clock.advance(Duration::minutes(5));
        f.screen.dispatch(TrackingIntent::EndExercise).unwrap();
        let entry = f.screen.snapshot().workout_exercise.unwrap();
        assert!(entry.start_time.is_some() && entry.end_time.is_some());

        f.screen
            .dispatch(TrackingIntent::ShowDialog(TrackingDialog::ResetExerciseEnd))
            .unwrap();
        f.screen.dispatch(TrackingIntent::ConfirmDialog).unwrap();
        let entry = f.screen.snapshot().workout_exercise.unwrap();
        assert!(entry.start_time.is_some());
        assert_eq!(entry.end_time, None);

        f.screen
            .dispatch(TrackingIntent::ShowDialog(TrackingDialog::ResetExerciseStart))
            .unwrap();
        f.screen.dispatch(TrackingIntent::ConfirmDialog).unwrap();
        let entry = f.screen.snapshot().workout_exercise.unwrap();
        assert_eq!(entry.start_time, None);
        assert_eq!(entry.end_time, None);

        let workout_id = f.screen.snapshot().workout.id;
        let stored = f.store.watch_workout_exercise(workout_id, f.exercise.id).unwrap();
        assert_eq!(stored.borrow().as_ref().and_then(|e| e.start_time), None);
    }

    #[test]
    fn test_notes_editing() {
        let mut f = fixture();
        add_sets(&mut f, "100", "5", "1");
        let id = set_ids(&f)[0];

        f.screen.dispatch(TrackingIntent::BeginEditNote(id)).unwrap();
        f.screen
            .dispatch(TrackingIntent::NoteTextChanged("paused at bottom".into()))
            .unwrap();
        f.screen.dispatch(TrackingIntent::SaveNote).unwrap();

        let view = f.screen.snapshot();
        assert_eq!(view.logged_sets[0].entry.notes, "paused at bottom");
        assert_eq!(view.editing_notes_set_id, None);
        assert!(view.editing_notes_text.is_empty());
    }
}
