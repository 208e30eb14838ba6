//! Workout of a day: its exercises, start/end times and deletion.
//!
//! The live workout query is keyed by the selected date; picking another
//! date swaps the subscription for the new day's query.

use super::{take_changed, Effect, Screen};
use crate::clock::Clock;
use crate::combine::Combiner;
use crate::selection::Selection;
use crate::store::{Live, WorkoutStore};
use crate::{Exercise, ExerciseId, Result, Workout, WorkoutWithExercises};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkoutDialog {
    ChooseStartAction,
    ChooseEndAction,
    ResetStartTime,
    ResetEndTime,
    EditStartTime,
    EditEndTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightWorkoutView {
    pub selected_date: NaiveDate,
    pub calendar_expanded: bool,
    pub workout: Option<Workout>,
    pub exercises: Vec<Exercise>,
    pub selection_mode: bool,
    pub selected_ids: BTreeSet<ExerciseId>,
    pub active_dialog: Option<WorkoutDialog>,
    pub time_input_hours: String,
    pub time_input_minutes: String,
}

#[derive(Clone, Debug)]
pub enum WeightWorkoutIntent {
    ToggleCalendar,
    SelectDate(NaiveDate),
    ShowDialog(WorkoutDialog),
    DismissDialog,
    HoursChanged(String),
    MinutesChanged(String),
    StartWorkout,
    EndWorkout,
    ConfirmResetStart,
    ConfirmResetEnd,
    SaveEditedTime,
    ToggleExerciseSelection(ExerciseId),
    ClearSelection,
    DeleteSelected,
}

#[derive(Default)]
struct DialogState {
    active: Option<WorkoutDialog>,
    hours: String,
    minutes: String,
}

struct Inputs {
    selected_date: NaiveDate,
    calendar_expanded: bool,
    workout: Option<WorkoutWithExercises>,
    selection: Selection<ExerciseId>,
    dialog: DialogState,
}

fn merge(inputs: &Inputs) -> WeightWorkoutView {
    WeightWorkoutView {
        selected_date: inputs.selected_date,
        calendar_expanded: inputs.calendar_expanded,
        workout: inputs.workout.as_ref().map(|w| w.workout.clone()),
        exercises: inputs
            .workout
            .as_ref()
            .map(|w| w.exercises.clone())
            .unwrap_or_default(),
        selection_mode: inputs.selection.is_selection_mode(),
        selected_ids: inputs.selection.ids().clone(),
        active_dialog: inputs.dialog.active,
        time_input_hours: inputs.dialog.hours.clone(),
        time_input_minutes: inputs.dialog.minutes.clone(),
    }
}

/// Accept at most two digits
fn is_time_field(text: &str) -> bool {
    text.len() <= 2 && text.chars().all(|c| c.is_ascii_digit())
}

fn hh_mm(time: Option<DateTime<Utc>>) -> (String, String) {
    match time {
        Some(t) => (t.format("%H").to_string(), t.format("%M").to_string()),
        None => (String::new(), String::new()),
    }
}

pub struct WeightWorkoutController {
    store: Arc<dyn WorkoutStore>,
    clock: Arc<dyn Clock>,
    workout_rx: Live<Option<WorkoutWithExercises>>,
    state: Combiner<Inputs, WeightWorkoutView>,
}

impl WeightWorkoutController {
    pub fn new(store: Arc<dyn WorkoutStore>, clock: Arc<dyn Clock>, date: NaiveDate) -> Result<Self> {
        let mut workout_rx = store.watch_workout_for_date(date)?;
        let inputs = Inputs {
            selected_date: date,
            calendar_expanded: false,
            workout: workout_rx.borrow_and_update().clone(),
            selection: Selection::default(),
            dialog: DialogState::default(),
        };
        Ok(Self {
            store,
            clock,
            workout_rx,
            state: Combiner::new(inputs, merge),
        })
    }

    pub fn snapshot(&self) -> WeightWorkoutView {
        self.state.snapshot()
    }

    fn current_workout(&self) -> Option<Workout> {
        self.state.inputs().workout.as_ref().map(|w| w.workout.clone())
    }

    fn select_date(&mut self, date: NaiveDate) -> Result<()> {
        let mut workout_rx = self.store.watch_workout_for_date(date)?;
        let workout = workout_rx.borrow_and_update().clone();
        self.workout_rx = workout_rx;
        tracing::debug!("Workout screen switched to {}", date);
        self.state.update(|s| {
            s.selected_date = date;
            s.calendar_expanded = false;
            s.workout = workout;
            s.selection.clear();
        });
        Ok(())
    }

    fn show_dialog(&mut self, dialog: WorkoutDialog) {
        let workout = self.current_workout();
        let (hours, minutes) = match (dialog, &workout) {
            (WorkoutDialog::EditStartTime, Some(w)) => hh_mm(w.start_time),
            (WorkoutDialog::EditEndTime, Some(w)) => hh_mm(w.end_time),
            _ => (String::new(), String::new()),
        };
        self.state.update(|s| {
            s.dialog = DialogState {
                active: Some(dialog),
                hours,
                minutes,
            }
        });
    }

    fn dismiss_dialog(&mut self) {
        self.state.update(|s| s.dialog = DialogState::default());
    }

    fn write_workout(&self, f: impl FnOnce(&mut Workout) -> bool) -> Result<()> {
        let Some(mut workout) = self.current_workout() else {
            return Ok(());
        };
        if f(&mut workout) {
            tracing::info!("Updating workout {} on {}", workout.id, workout.date);
            self.store.update_workout(workout)?;
        }
        Ok(())
    }

    fn save_edited_time(&mut self) -> Result<()> {
        let inputs = self.state.inputs();
        let hours = inputs.dialog.hours.parse::<u32>().map_or(0, |h| h.min(23));
        let minutes = inputs.dialog.minutes.parse::<u32>().map_or(0, |m| m.min(59));
        let active = inputs.dialog.active;
        let timestamp = inputs
            .selected_date
            .and_hms_opt(hours, minutes, 0)
            .map(|dt| dt.and_utc());

        self.write_workout(|w| match (active, timestamp) {
            (Some(WorkoutDialog::EditStartTime), Some(t)) => {
                w.start_time = Some(t);
                true
            }
            (Some(WorkoutDialog::EditEndTime), Some(t)) => {
                w.end_time = Some(t);
                true
            }
            _ => false,
        })?;
        self.dismiss_dialog();
        Ok(())
    }

    fn delete_selected(&mut self) -> Result<()> {
        let ids = self.state.inputs().selection.to_vec();
        if let (Some(workout), false) = (self.current_workout(), ids.is_empty()) {
            tracing::info!("Removing {} exercises from workout {}", ids.len(), workout.id);
            self.store.delete_workout_exercises(workout.id, &ids)?;
        }
        self.state.update(|s| s.selection.clear());
        Ok(())
    }
}

impl Screen for WeightWorkoutController {
    type Intent = WeightWorkoutIntent;
    type View = WeightWorkoutView;

    fn dispatch(&mut self, intent: WeightWorkoutIntent) -> Result<Vec<Effect>> {
        match intent {
            WeightWorkoutIntent::ToggleCalendar => {
                self.state.update(|s| s.calendar_expanded = !s.calendar_expanded)
            }
            WeightWorkoutIntent::SelectDate(date) => self.select_date(date)?,
            WeightWorkoutIntent::ShowDialog(dialog) => self.show_dialog(dialog),
            WeightWorkoutIntent::DismissDialog => self.dismiss_dialog(),
            WeightWorkoutIntent::HoursChanged(text) => {
                if is_time_field(&text) {
                    self.state.update(|s| s.dialog.hours = text);
                }
            }
            WeightWorkoutIntent::MinutesChanged(text) => {
                if is_time_field(&text) {
                    self.state.update(|s| s.dialog.minutes = text);
                }
            }
            WeightWorkoutIntent::StartWorkout => {
                let now = self.clock.now();
                self.write_workout(|w| {
                    if w.start_time.is_some() {
                        return false;
                    }
                    w.start_time = Some(now);
                    true
                })?
            }
            WeightWorkoutIntent::EndWorkout => {
                let now = self.clock.now();
                self.write_workout(|w| {
                    if w.end_time.is_some() {
                        return false;
                    }
                    w.end_time = Some(now);
                    true
                })?
            }
            WeightWorkoutIntent::ConfirmResetStart => {
                self.write_workout(|w| {
                    w.start_time = None;
                    true
                })?;
                self.dismiss_dialog();
            }
            WeightWorkoutIntent::ConfirmResetEnd => {
                self.write_workout(|w| {
                    w.end_time = None;
                    true
                })?;
                self.dismiss_dialog();
            }
            WeightWorkoutIntent::SaveEditedTime => self.save_edited_time()?,
            WeightWorkoutIntent::ToggleExerciseSelection(id) => {
                self.state.update(|s| s.selection.toggle(id))
            }
            WeightWorkoutIntent::ClearSelection => self.state.update(|s| s.selection.clear()),
            WeightWorkoutIntent::DeleteSelected => self.delete_selected()?,
        }
        self.refresh();
        Ok(Vec::new())
    }

    fn refresh(&mut self) -> bool {
        match take_changed(&mut self.workout_rx) {
            Some(workout) => {
                self.state.update(|s| s.workout = workout);
                true
            }
            None => false,
        }
    }

    fn subscribe(&self) -> watch::Receiver<WeightWorkoutView> {
        self.state.subscribe()
    }
}
