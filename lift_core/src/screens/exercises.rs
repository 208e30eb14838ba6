//! Exercise library browser and picker.
//!
//! Combines the live exercise list and category list with the category
//! filter, search text and multi-selection. In selection mode the picked
//! exercises are added to the workout of the target date.

use super::{take_changed, Effect, Screen, ScreenArgs};
use crate::combine::Combiner;
use crate::events::{EventSender, UiEvent};
use crate::selection::Selection;
use crate::store::{add_exercises_to_date, Live, WorkoutStore};
use crate::{Error, Exercise, ExerciseId, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExercisesMode {
    /// Browsing the library
    Management,
    /// Picking exercises for a workout
    Selection,
}

impl FromStr for ExercisesMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "management" => Ok(ExercisesMode::Management),
            "selection" => Ok(ExercisesMode::Selection),
            other => Err(Error::Other(format!("Unknown exercises mode: {}", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExercisesView {
    pub mode: ExercisesMode,
    pub target_date: NaiveDate,
    pub exercises: Vec<Exercise>,
    pub categories: Vec<String>,
    pub category_filter: Option<String>,
    pub search_query: String,
    pub selection_mode: bool,
    pub selected_ids: BTreeSet<ExerciseId>,
}

#[derive(Clone, Debug)]
pub enum ExercisesIntent {
    SearchChanged(String),
    SelectCategory(Option<String>),
    ToggleSelection(ExerciseId),
    ClearSelection,
    AddSelectedToWorkout,
    AddSingleToWorkout(ExerciseId),
}

struct Inputs {
    mode: ExercisesMode,
    target_date: NaiveDate,
    all_exercises: Vec<Exercise>,
    categories: Vec<String>,
    category_filter: Option<String>,
    search_query: String,
    selection: Selection<ExerciseId>,
}

fn merge(inputs: &Inputs) -> ExercisesView {
    let query = inputs.search_query.trim().to_lowercase();
    let exercises = inputs
        .all_exercises
        .iter()
        .filter(|e| {
            inputs
                .category_filter
                .as_ref()
                .map_or(true, |c| &e.category == c)
        })
        .filter(|e| query.is_empty() || e.name.to_lowercase().contains(&query))
        .cloned()
        .collect();

    ExercisesView {
        mode: inputs.mode,
        target_date: inputs.target_date,
        exercises,
        categories: inputs.categories.clone(),
        category_filter: inputs.category_filter.clone(),
        search_query: inputs.search_query.clone(),
        selection_mode: inputs.selection.is_selection_mode(),
        selected_ids: inputs.selection.ids().clone(),
    }
}

pub struct ExercisesController {
    store: Arc<dyn WorkoutStore>,
    events: EventSender,
    exercises: Live<Vec<Exercise>>,
    categories: Live<Vec<String>>,
    state: Combiner<Inputs, ExercisesView>,
}

impl ExercisesController {
    pub fn new(
        store: Arc<dyn WorkoutStore>,
        events: EventSender,
        mode: ExercisesMode,
        target_date: NaiveDate,
    ) -> Result<Self> {
        let mut exercises = store.watch_exercises()?;
        let mut categories = store.watch_categories()?;
        let inputs = Inputs {
            mode,
            target_date,
            all_exercises: exercises.borrow_and_update().clone(),
            categories: categories.borrow_and_update().clone(),
            category_filter: None,
            search_query: String::new(),
            selection: Selection::default(),
        };
        Ok(Self {
            store,
            events,
            exercises,
            categories,
            state: Combiner::new(inputs, merge),
        })
    }

    /// Open from navigation arguments `date` and `mode`
    pub fn open(store: Arc<dyn WorkoutStore>, events: EventSender, args: &ScreenArgs) -> Result<Self> {
        let date: NaiveDate = args.parse("date")?;
        let mode: ExercisesMode = args.parse("mode")?;
        Self::new(store, events, mode, date)
    }

    pub fn snapshot(&self) -> ExercisesView {
        self.state.snapshot()
    }

    fn add_selected(&mut self) -> Result<()> {
        let ids = self.state.inputs().selection.to_vec();
        if ids.is_empty() {
            return Ok(());
        }
        let date = self.state.inputs().target_date;
        add_exercises_to_date(self.store.as_ref(), date, &ids)?;
        self.events.emit(UiEvent::ExercisesAdded(ids.len()));
        self.state.update(|s| s.selection.clear());
        Ok(())
    }

    fn add_single(&mut self, id: ExerciseId) -> Result<()> {
        let date = self.state.inputs().target_date;
        add_exercises_to_date(self.store.as_ref(), date, &[id])?;
        self.events.emit(UiEvent::ExerciseAdded);
        Ok(())
    }
}

impl Screen for ExercisesController {
    type Intent = ExercisesIntent;
    type View = ExercisesView;

    fn dispatch(&mut self, intent: ExercisesIntent) -> Result<Vec<Effect>> {
        match intent {
            ExercisesIntent::SearchChanged(query) => self.state.update(|s| s.search_query = query),
            ExercisesIntent::SelectCategory(category) => {
                self.state.update(|s| s.category_filter = category)
            }
            ExercisesIntent::ToggleSelection(id) => self.state.update(|s| s.selection.toggle(id)),
            ExercisesIntent::ClearSelection => self.state.update(|s| s.selection.clear()),
            ExercisesIntent::AddSelectedToWorkout => self.add_selected()?,
            ExercisesIntent::AddSingleToWorkout(id) => self.add_single(id)?,
        }
        self.refresh();
        Ok(Vec::new())
    }

    fn refresh(&mut self) -> bool {
        let exercises = take_changed(&mut self.exercises);
        let categories = take_changed(&mut self.categories);
        if exercises.is_none() && categories.is_none() {
            return false;
        }
        self.state.update(|s| {
            if let Some(exercises) = exercises {
                s.all_exercises = exercises;
            }
            if let Some(categories) = categories {
                s.categories = categories;
            }
        });
        true
    }

    fn subscribe(&self) -> watch::Receiver<ExercisesView> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::store::FileStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 22).unwrap()
    }

    fn seeded() -> (Arc<FileStore>, Vec<Exercise>) {
        let store = Arc::new(FileStore::in_memory());
        let exercises = vec![
            Exercise::new("Bench Press", "Chest", ""),
            Exercise::new("Incline Press", "Chest", ""),
            Exercise::new("Barbell Row", "Back", ""),
        ];
        for e in &exercises {
            store.insert_exercise(e.clone()).unwrap();
        }
        (store, exercises)
    }

    #[test]
    fn test_filter_by_category_and_search() {
        let (store, _) = seeded();
        let (tx, _rx) = events::channel();
        let mut screen = ExercisesController::new(store, tx, ExercisesMode::Management, day()).unwrap();

        assert_eq!(screen.snapshot().exercises.len(), 3);
        assert_eq!(screen.snapshot().categories, vec!["Back", "Chest"]);

        screen
            .dispatch(ExercisesIntent::SelectCategory(Some("Chest".into())))
            .unwrap();
        assert_eq!(screen.snapshot().exercises.len(), 2);

        screen
            .dispatch(ExercisesIntent::SearchChanged("INCLINE".into()))
            .unwrap();
        let view = screen.snapshot();
        assert_eq!(view.exercises.len(), 1);
        assert_eq!(view.exercises[0].name, "Incline Press");

        screen.dispatch(ExercisesIntent::SearchChanged("   ".into())).unwrap();
        assert_eq!(screen.snapshot().exercises.len(), 2);
    }

    #[test]
    fn test_library_changes_flow_into_view() {
        let (store, _) = seeded();
        let (tx, _rx) = events::channel();
        let mut screen =
            ExercisesController::new(store.clone(), tx, ExercisesMode::Management, day()).unwrap();

        store.insert_exercise(Exercise::new("Dip", "Arms", "")).unwrap();
        assert!(screen.refresh());

        let view = screen.snapshot();
        assert_eq!(view.exercises.len(), 4);
        assert!(view.categories.contains(&"Arms".to_string()));
        assert!(!screen.refresh());
    }

    #[test]
    fn test_batch_add_emits_event_and_clears_selection() {
        let (store, exercises) = seeded();
        let (tx, mut rx) = events::channel();
        let mut screen =
            ExercisesController::new(store.clone(), tx, ExercisesMode::Selection, day()).unwrap();

        screen.dispatch(ExercisesIntent::ToggleSelection(exercises[0].id)).unwrap();
        screen.dispatch(ExercisesIntent::ToggleSelection(exercises[2].id)).unwrap();
        assert!(screen.snapshot().selection_mode);

        screen.dispatch(ExercisesIntent::AddSelectedToWorkout).unwrap();

        assert_eq!(rx.try_recv().unwrap(), UiEvent::ExercisesAdded(2));
        assert!(rx.try_recv().is_err());
        let view = screen.snapshot();
        assert!(!view.selection_mode);
        assert!(view.selected_ids.is_empty());

        let joined = store.watch_workout_for_date(day()).unwrap();
        assert_eq!(joined.borrow().as_ref().unwrap().exercises.len(), 2);

        // Repeat add does not duplicate rows
        screen.dispatch(ExercisesIntent::ToggleSelection(exercises[0].id)).unwrap();
        screen.dispatch(ExercisesIntent::ToggleSelection(exercises[2].id)).unwrap();
        screen.dispatch(ExercisesIntent::AddSelectedToWorkout).unwrap();
        let joined = store.watch_workout_for_date(day()).unwrap();
        assert_eq!(joined.borrow().as_ref().unwrap().exercises.len(), 2);
    }

    #[test]
    fn test_add_with_empty_selection_is_noop() {
        let (store, _) = seeded();
        let (tx, mut rx) = events::channel();
        let mut screen =
            ExercisesController::new(store.clone(), tx, ExercisesMode::Selection, day()).unwrap();

        screen.dispatch(ExercisesIntent::AddSelectedToWorkout).unwrap();

        assert!(rx.try_recv().is_err());
        assert!(store.workout_by_date(day()).unwrap().is_none());
    }

    #[test]
    fn test_single_add_creates_workout() {
        let (store, exercises) = seeded();
        let (tx, mut rx) = events::channel();
        let mut screen =
            ExercisesController::new(store.clone(), tx, ExercisesMode::Selection, day()).unwrap();

        screen
            .dispatch(ExercisesIntent::AddSingleToWorkout(exercises[1].id))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), UiEvent::ExerciseAdded);
        assert!(store.workout_by_date(day()).unwrap().is_some());
    }

    #[test]
    fn test_open_parses_navigation_arguments() {
        let (store, _) = seeded();
        let (tx, _rx) = events::channel();
        let args = ScreenArgs::new()
            .with("date", "2025-08-22")
            .with("mode", "SELECTION");
        let screen = ExercisesController::open(store, tx, &args).unwrap();
        assert_eq!(screen.snapshot().mode, ExercisesMode::Selection);
        assert_eq!(screen.snapshot().target_date, day());
    }
}
