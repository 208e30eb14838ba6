//! Configuration file support for Lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::screens::TrackingSettings;
use crate::units::WeightUnit;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub units: UnitsConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Rest timer defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: u32,

    /// Start the rest timer whenever a set is completed
    #[serde(default)]
    pub auto_start: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_duration_secs(),
            auto_start: false,
        }
    }
}

/// Weight display and stepping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitsConfig {
    #[serde(default)]
    pub default_unit: WeightUnit,

    #[serde(default = "default_kg_step")]
    pub kg_step: f64,

    #[serde(default = "default_lb_step")]
    pub lb_step: f64,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            default_unit: WeightUnit::default(),
            kg_step: default_kg_step(),
            lb_step: default_lb_step(),
        }
    }
}

/// Categories offered when adding an exercise
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("lift")
}

fn default_duration_secs() -> u32 {
    60
}

fn default_kg_step() -> f64 {
    0.5
}

fn default_lb_step() -> f64 {
    2.5
}

fn default_categories() -> Vec<String> {
    ["Chest", "Back", "Legs", "Shoulders", "Arms", "Core"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_log_level() -> String {
    "warn".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("lift").join("config.toml")
    }

    /// Location of the workout store inside the data directory
    pub fn store_path(&self) -> PathBuf {
        self.data.data_dir.join("workouts.json")
    }

    /// Defaults for a newly opened tracking screen
    pub fn tracking_settings(&self) -> TrackingSettings {
        TrackingSettings {
            timer_duration_secs: self.timer.default_duration_secs,
            auto_start: self.timer.auto_start,
            unit: self.units.default_unit,
            kg_step: self.units.kg_step,
            lb_step: self.units.lb_step,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timer.default_duration_secs == 0 {
            return Err(Error::Config(
                "timer.default_duration_secs must be at least 1".into(),
            ));
        }
        for (name, step) in [("kg_step", self.units.kg_step), ("lb_step", self.units.lb_step)] {
            if !(step.is_finite() && step > 0.0) {
                return Err(Error::Config(format!(
                    "units.{} must be a positive number, got {}",
                    name, step
                )));
            }
        }
        Ok(())
    }

    /// Render as the TOML that `save_to` writes
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
