//! Weight units and conversion.
//!
//! Weights are persisted in pounds. Every conversion is rounded to one
//! decimal place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pounds per kilogram
pub const LB_PER_KG: f64 = 2.20462;

/// Display unit for weight inputs and logged sets
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    /// The other unit
    pub fn toggled(self) -> Self {
        match self {
            WeightUnit::Kg => WeightUnit::Lb,
            WeightUnit::Lb => WeightUnit::Kg,
        }
    }

    /// Convert a value entered in this unit to pounds for storage
    pub fn to_lb(self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => kg_to_lb(value),
            WeightUnit::Lb => value,
        }
    }

    /// Convert a stored pound value into this unit for display
    pub fn from_lb(self, lb: f64) -> f64 {
        match self {
            WeightUnit::Kg => lb_to_kg(lb),
            WeightUnit::Lb => lb,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WeightUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" | "kilograms" => Ok(WeightUnit::Kg),
            "lb" | "lbs" | "pounds" => Ok(WeightUnit::Lb),
            other => Err(crate::Error::Other(format!("Unknown weight unit: {}", other))),
        }
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn kg_to_lb(kg: f64) -> f64 {
    round1(kg * LB_PER_KG)
}

pub fn lb_to_kg(lb: f64) -> f64 {
    round1(lb / LB_PER_KG)
}

/// Parse a weight text field. Returns `None` for anything that is not a
/// finite, non-negative number.
pub fn parse_weight(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w >= 0.0)
}

/// Render a weight for a text field
pub fn format_weight(value: f64) -> String {
    format!("{:.1}", value)
}
