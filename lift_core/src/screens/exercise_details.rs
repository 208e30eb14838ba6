//! Exercise details: header and tabs for one library exercise.

use super::{Effect, Screen, ScreenArgs};
use crate::combine::Combiner;
use crate::{ExerciseId, Result};
use tokio::sync::watch;

#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseDetailsView {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub selected_tab: usize,
}

#[derive(Clone, Debug)]
pub enum ExerciseDetailsIntent {
    SelectTab(usize),
}

pub struct ExerciseDetailsController {
    state: Combiner<ExerciseDetailsView, ExerciseDetailsView>,
}

fn merge(inputs: &ExerciseDetailsView) -> ExerciseDetailsView {
    inputs.clone()
}

impl ExerciseDetailsController {
    /// Requires `exerciseId` and `exerciseName`
    pub fn open(args: &ScreenArgs) -> Result<Self> {
        let exercise_id: ExerciseId = args.parse("exerciseId")?;
        let exercise_name = args.require("exerciseName")?.to_string();
        Ok(Self {
            state: Combiner::new(
                ExerciseDetailsView {
                    exercise_id,
                    exercise_name,
                    selected_tab: 0,
                },
                merge,
            ),
        })
    }

    pub fn snapshot(&self) -> ExerciseDetailsView {
        self.state.snapshot()
    }
}

impl Screen for ExerciseDetailsController {
    type Intent = ExerciseDetailsIntent;
    type View = ExerciseDetailsView;

    fn dispatch(&mut self, intent: ExerciseDetailsIntent) -> Result<Vec<Effect>> {
        match intent {
            ExerciseDetailsIntent::SelectTab(index) => self.state.update(|s| s.selected_tab = index),
        }
        Ok(Vec::new())
    }

    fn subscribe(&self) -> watch::Receiver<ExerciseDetailsView> {
        self.state.subscribe()
    }
}
