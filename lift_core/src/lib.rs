#![forbid(unsafe_code)]

//! Core of the Lift workout log.
//!
//! This crate provides:
//! - Domain types (exercises, workouts, logged sets) and weight units
//! - The persistence interface with live queries, and a JSON file store
//! - Per-screen controllers that combine live data with local UI state
//! - The rest countdown and the task that runs each open screen
//! - Config, logging, CSV export and the default exercise library

pub mod clock;
pub mod combine;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod library;
pub mod logging;
pub mod runtime;
pub mod screens;
pub mod selection;
pub mod sets;
pub mod store;
pub mod timer;
pub mod types;
pub mod units;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventSender, EventStream, UiEvent};
pub use store::{FileStore, WorkoutStore};
pub use types::*;
pub use units::WeightUnit;
