//! Per-field post-processing directives for predicted values.

use serde::{Deserialize, Serialize};

/// Integer cast mode applied after clipping and rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CastInteger {
    Round,
    Ceiling,
    Floor,
}

/// One enumerated target value entry.
///
/// For categorical targets an entry pairs a class `value` with an optional
/// display value and prior probability. For regression targets a single
/// value-less entry may carry the default prediction. Defaults and priors
/// are mutually exclusive per entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetValue {
    pub value: Option<String>,
    pub display_value: Option<String>,
    pub prior_probability: Option<f64>,
    pub default_value: Option<f64>,
}

/// Post-processing directive for one target field.
///
/// Applied as: clip to `[min, max]`, then `value * rescale_factor +
/// rescale_constant`, then the optional integer cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub rescale_factor: f64,
    pub rescale_constant: f64,
    pub cast_integer: Option<CastInteger>,
    pub values: Vec<TargetValue>,
}

impl Target {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            min: None,
            max: None,
            rescale_factor: 1.0,
            rescale_constant: 0.0,
            cast_integer: None,
            values: Vec::new(),
        }
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_rescale(mut self, factor: f64, constant: f64) -> Self {
        self.rescale_factor = factor;
        self.rescale_constant = constant;
        self
    }

    pub fn with_cast(mut self, cast: CastInteger) -> Self {
        self.cast_integer = Some(cast);
        self
    }

    pub fn with_value(mut self, value: TargetValue) -> Self {
        self.values.push(value);
        self
    }
}
