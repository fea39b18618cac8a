//! Post-processing of raw predictions against declared targets.
//!
//! Regression predictions are clipped, rescaled, and optionally cast to
//! integer; absent predictions take the target's declared default value.
//! Classification results that are absent take a prior-probability
//! distribution. Fields without a declared target pass through unchanged.

use indexmap::IndexMap;

use crate::error::{EvalError, Result};
use crate::schema::{CastInteger, ModelSchema, Target, TargetValue};
use crate::value::TypedValue;

use super::result::{Distribution, DistributionKind, Prediction, PredictionMap};

/// Post-process regression predictions.
pub fn evaluate_regression(
    predictions: IndexMap<String, Option<f64>>,
    schema: &ModelSchema,
) -> Result<PredictionMap> {
    let mut result = PredictionMap::with_capacity(predictions.len());

    for (field, value) in predictions {
        let processed = match schema.target(&field) {
            Some(target) => match value {
                Some(value) => Some(process(target, value)),
                None => default_value(target)?.map(TypedValue::double),
            },
            None => value.map(TypedValue::double),
        };

        result.insert(field, processed.map(Prediction::Value));
    }

    Ok(result)
}

/// Post-process the single prediction of the model's primary target field.
pub fn evaluate_regression_value(
    value: Option<f64>,
    schema: &ModelSchema,
) -> Result<PredictionMap> {
    let target_field = schema
        .target_field
        .clone()
        .ok_or_else(|| EvalError::MissingField("<target field>".into()))?;

    evaluate_regression(IndexMap::from([(target_field, value)]), schema)
}

/// Post-process classification results.
pub fn evaluate_classification(
    predictions: IndexMap<String, Option<Distribution>>,
    schema: &ModelSchema,
) -> Result<PredictionMap> {
    let mut result = PredictionMap::with_capacity(predictions.len());

    for (field, value) in predictions {
        let processed = match (schema.target(&field), value) {
            (Some(target), None) => Some(prior_probabilities(target)?),
            (_, value) => value,
        };

        result.insert(field, processed.map(Prediction::Distribution));
    }

    Ok(result)
}

/// Clip, rescale, and optionally cast one predicted value.
pub fn process(target: &Target, value: f64) -> TypedValue {
    let mut result = value;

    if let Some(min) = target.min {
        result = result.max(min);
    }
    if let Some(max) = target.max {
        result = result.min(max);
    }

    result = result * target.rescale_factor + target.rescale_constant;

    match target.cast_integer {
        None => TypedValue::double(result),
        Some(CastInteger::Round) => TypedValue::integer(result.round() as i64),
        Some(CastInteger::Ceiling) => TypedValue::integer(result.ceil() as i64),
        Some(CastInteger::Floor) => TypedValue::integer(result.floor() as i64),
    }
}

/// The target value entry matching a predicted value, by coercion equality.
pub fn target_value_for<'a>(
    target: &'a Target,
    value: &TypedValue,
) -> Result<Option<&'a TargetValue>> {
    for entry in &target.values {
        let Some(entry_value) = entry.value.as_deref() else {
            continue;
        };
        if value.equals_string(entry_value)? {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// The default value substituted for an absent regression prediction.
///
/// The target must declare exactly one entry, and that entry must carry
/// neither a class value nor a prior probability.
fn default_value(target: &Target) -> Result<Option<f64>> {
    let [entry] = target.values.as_slice() else {
        return Err(EvalError::InvalidFeature(format!(
            "target {} must declare exactly one default entry, found {}",
            target.field,
            target.values.len()
        )));
    };

    if entry.value.is_some() || entry.prior_probability.is_some() {
        return Err(EvalError::InvalidFeature(format!(
            "the default entry of target {} may not carry a value or prior",
            target.field
        )));
    }

    Ok(entry.default_value)
}

/// The prior-probability distribution substituted for an absent
/// classification result.
///
/// Per entry, defaults and priors are mutually exclusive.
fn prior_probabilities(target: &Target) -> Result<Distribution> {
    let mut distribution = Distribution::new(DistributionKind::Probability);

    for entry in &target.values {
        if entry.default_value.is_some() {
            return Err(EvalError::InvalidFeature(format!(
                "a prior entry of target {} may not carry a default value",
                target.field
            )));
        }

        let (Some(value), Some(prior)) = (entry.value.as_deref(), entry.prior_probability)
        else {
            return Err(EvalError::InvalidFeature(format!(
                "a prior entry of target {} must pair a value with a prior probability",
                target.field
            )));
        };

        distribution.insert(value, prior);
    }

    Ok(distribution)
}
