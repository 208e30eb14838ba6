//! One-shot notifications for the rendering surface.
//!
//! Events travel over an unbounded mpsc channel, so each emission is received
//! at most once.

use std::fmt;
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// A batch of exercises was added to a workout
    ExercisesAdded(usize),
    /// A single exercise was added to a workout
    ExerciseAdded,
    /// A new exercise was saved to the library
    ExerciseCreated(String),
    /// A store write failed; nothing was retried
    WriteFailed(String),
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiEvent::ExercisesAdded(n) => write!(f, "{} exercises added", n),
            UiEvent::ExerciseAdded => f.write_str("Exercise added"),
            UiEvent::ExerciseCreated(name) => write!(f, "{} saved", name),
            UiEvent::WriteFailed(reason) => write!(f, "Could not save: {}", reason),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<UiEvent>,
}

pub type EventStream = mpsc::UnboundedReceiver<UiEvent>;

pub fn channel() -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

impl EventSender {
    /// Emit an event. A closed receiver means the screen is gone; the event
    /// is dropped.
    pub fn emit(&self, event: UiEvent) {
        tracing::debug!("Event: {}", event);
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver closed, dropping event");
        }
    }
}
