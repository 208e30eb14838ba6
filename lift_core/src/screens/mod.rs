//! Per-screen controllers.
//!
//! Each controller owns its state slices inside a [`crate::combine::Combiner`]
//! and publishes one immutable view snapshot. The rendering surface calls
//! [`Screen::dispatch`] with named intents and reads snapshots through
//! [`Screen::subscribe`].

pub mod exercise_addition;
pub mod exercise_details;
pub mod exercises;
pub mod home;
pub mod weight_exercise_tracking;
pub mod weight_workout;

pub use exercise_addition::{
    CategoryChoice, ExerciseAdditionController, ExerciseAdditionIntent, ExerciseAdditionView,
};
pub use exercise_details::{ExerciseDetailsController, ExerciseDetailsIntent, ExerciseDetailsView};
pub use exercises::{ExercisesController, ExercisesIntent, ExercisesMode, ExercisesView};
pub use home::{HomeController, HomeIntent, HomeView};
pub use weight_exercise_tracking::{
    LoggedSetRow, TimerView, TrackingController, TrackingDialog, TrackingIntent, TrackingSettings,
    TrackingView,
};
pub use weight_workout::{
    WeightWorkoutController, WeightWorkoutIntent, WeightWorkoutView, WorkoutDialog,
};

use crate::timer::TickerLease;
use crate::{Error, Result};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::watch;

/// Side effects a controller asks its runtime to perform
#[derive(Debug)]
pub enum Effect {
    /// Begin posting one-second ticks for a countdown run
    StartTicker(TickerLease),
}

pub trait Screen: Send + 'static {
    type Intent: Send + 'static;
    type View: Clone + Send + Sync + 'static;

    /// Apply one intent. Store failures surface as `Err`; invalid input is a
    /// silent no-op.
    fn dispatch(&mut self, intent: Self::Intent) -> Result<Vec<Effect>>;

    /// Pull pending live-query results into the view. Returns whether
    /// anything changed.
    fn refresh(&mut self) -> bool {
        false
    }

    /// Deliver a countdown tick
    fn on_tick(&mut self, _generation: u64) -> Vec<Effect> {
        Vec::new()
    }

    fn subscribe(&self) -> watch::Receiver<Self::View>;
}

/// Take the latest value of a live query if it changed since last read
pub(crate) fn take_changed<T: Clone>(rx: &mut watch::Receiver<T>) -> Option<T> {
    match rx.has_changed() {
        Ok(true) => Some(rx.borrow_and_update().clone()),
        _ => None,
    }
}

/// Navigation arguments handed to a screen when it opens
#[derive(Clone, Debug, Default)]
pub struct ScreenArgs {
    values: HashMap<String, String>,
}

impl ScreenArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// A required argument; its absence is fatal for the screen
    pub fn require(&self, key: &'static str) -> Result<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or(Error::MissingArgument(key))
    }

    pub fn parse<T: FromStr>(&self, key: &'static str) -> Result<T> {
        let raw = self.require(key)?;
        raw.parse::<T>().map_err(|_| Error::InvalidArgument {
            key,
            value: raw.to_string(),
        })
    }
}
