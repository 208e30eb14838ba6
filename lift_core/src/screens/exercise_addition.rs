//! New exercise form.

use super::{take_changed, Effect, Screen};
use crate::combine::Combiner;
use crate::events::{EventSender, UiEvent};
use crate::store::{Live, WorkoutStore};
use crate::{Exercise, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// One entry of the category dropdown
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryChoice {
    Existing(String),
    /// Opens the "new category" dialog
    AddNew,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseAdditionView {
    pub name: String,
    pub notes: String,
    pub category_dropdown_expanded: bool,
    pub selected_category: String,
    pub categories: Vec<CategoryChoice>,
    pub add_category_dialog_open: bool,
    pub new_category_name: String,
    pub can_add: bool,
}

#[derive(Clone, Debug)]
pub enum ExerciseAdditionIntent {
    NameChanged(String),
    NotesChanged(String),
    ToggleCategoryDropdown,
    ChooseCategory(CategoryChoice),
    NewCategoryNameChanged(String),
    ConfirmNewCategory,
    DismissNewCategory,
    Add,
}

struct Inputs {
    name: String,
    notes: String,
    dropdown_expanded: bool,
    selected_category: String,
    configured: Vec<String>,
    stored: Vec<String>,
    added: Vec<String>,
    dialog_open: bool,
    new_category_name: String,
}

impl Inputs {
    /// Configured categories first, then stored ones, then ones added here
    fn category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.configured.iter().chain(&self.stored).chain(&self.added) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

fn merge(inputs: &Inputs) -> ExerciseAdditionView {
    let mut categories: Vec<CategoryChoice> = inputs
        .category_names()
        .into_iter()
        .map(CategoryChoice::Existing)
        .collect();
    categories.push(CategoryChoice::AddNew);

    ExerciseAdditionView {
        name: inputs.name.clone(),
        notes: inputs.notes.clone(),
        category_dropdown_expanded: inputs.dropdown_expanded,
        selected_category: inputs.selected_category.clone(),
        categories,
        add_category_dialog_open: inputs.dialog_open,
        new_category_name: inputs.new_category_name.clone(),
        can_add: !inputs.name.trim().is_empty(),
    }
}

pub struct ExerciseAdditionController {
    store: Arc<dyn WorkoutStore>,
    events: EventSender,
    stored_categories: Live<Vec<String>>,
    state: Combiner<Inputs, ExerciseAdditionView>,
}

impl ExerciseAdditionController {
    pub fn new(
        store: Arc<dyn WorkoutStore>,
        events: EventSender,
        configured_categories: Vec<String>,
    ) -> Result<Self> {
        let mut stored_categories = store.watch_categories()?;
        let inputs = Inputs {
            name: String::new(),
            notes: String::new(),
            dropdown_expanded: false,
            selected_category: String::new(),
            configured: configured_categories,
            stored: stored_categories.borrow_and_update().clone(),
            added: Vec::new(),
            dialog_open: false,
            new_category_name: String::new(),
        };
        Ok(Self {
            store,
            events,
            stored_categories,
            state: Combiner::new(inputs, merge),
        })
    }

    pub fn snapshot(&self) -> ExerciseAdditionView {
        self.state.snapshot()
    }

    fn add(&mut self) -> Result<()> {
        let inputs = self.state.inputs();
        let name = inputs.name.trim().to_string();
        if name.is_empty() {
            return Ok(());
        }
        let exercise = Exercise::new(
            name.clone(),
            inputs.selected_category.clone(),
            inputs.notes.clone(),
        );
        self.store.insert_exercise(exercise)?;
        self.events.emit(UiEvent::ExerciseCreated(name));
        self.state.update(|s| {
            s.name.clear();
            s.notes.clear();
        });
        Ok(())
    }
}

impl Screen for ExerciseAdditionController {
    type Intent = ExerciseAdditionIntent;
    type View = ExerciseAdditionView;

    fn dispatch(&mut self, intent: ExerciseAdditionIntent) -> Result<Vec<Effect>> {
        match intent {
            ExerciseAdditionIntent::NameChanged(name) => self.state.update(|s| s.name = name),
            ExerciseAdditionIntent::NotesChanged(notes) => self.state.update(|s| s.notes = notes),
            ExerciseAdditionIntent::ToggleCategoryDropdown => {
                self.state.update(|s| s.dropdown_expanded = !s.dropdown_expanded)
            }
            ExerciseAdditionIntent::ChooseCategory(CategoryChoice::AddNew) => {
                self.state.update(|s| {
                    s.dialog_open = true;
                    s.dropdown_expanded = false;
                })
            }
            ExerciseAdditionIntent::ChooseCategory(CategoryChoice::Existing(category)) => {
                self.state.update(|s| {
                    s.selected_category = category;
                    s.dropdown_expanded = false;
                })
            }
            ExerciseAdditionIntent::NewCategoryNameChanged(text) => {
                self.state.update(|s| s.new_category_name = text)
            }
            ExerciseAdditionIntent::ConfirmNewCategory => self.state.update(|s| {
                let candidate = s.new_category_name.trim().to_string();
                if !candidate.is_empty() && !s.category_names().contains(&candidate) {
                    s.added.push(candidate.clone());
                    s.selected_category = candidate;
                }
                s.new_category_name.clear();
                s.dialog_open = false;
            }),
            ExerciseAdditionIntent::DismissNewCategory => self.state.update(|s| {
                s.new_category_name.clear();
                s.dialog_open = false;
            }),
            ExerciseAdditionIntent::Add => self.add()?,
        }
        self.refresh();
        Ok(Vec::new())
    }

    fn refresh(&mut self) -> bool {
        match take_changed(&mut self.stored_categories) {
            Some(stored) => {
                self.state.update(|s| s.stored = stored);
                true
            }
            None => false,
        }
    }

    fn subscribe(&self) -> watch::Receiver<ExerciseAdditionView> {
        self.state.subscribe()
    }
}
