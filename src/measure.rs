//! Similarity and distance measures over field-value vectors.
//!
//! Used by neighborhood and clustering evaluators to score an input vector
//! against reference vectors. Similarity measures work on binary flag
//! vectors through a four-cell contingency tally; distance measures combine
//! weighted per-field inner distances via sum-then-root or max aggregation.
//!
//! Missing input values are skipped field-wise; [`calculate_adjustment`]
//! compensates the aggregate for the skipped weight.

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::value::TypedValue;

/// The similarity or distance measure of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    // Similarity over binary flags.
    SimpleMatching,
    Jaccard,
    Tanimoto,
    /// Fully parameterized binary similarity ratio
    /// `(c11*a11 + c10*a10 + c01*a01 + c00*a00) / (d11*a11 + ... + d00*a00)`.
    BinarySimilarity {
        c11: f64,
        c10: f64,
        c01: f64,
        c00: f64,
        d11: f64,
        d10: f64,
        d01: f64,
        d00: f64,
    },
    // Distance over continuous vectors.
    Euclidean,
    SquaredEuclidean,
    Chebychev,
    CityBlock,
    Minkowski {
        p: f64,
    },
}

impl Measure {
    pub fn is_similarity(&self) -> bool {
        matches!(
            self,
            Self::SimpleMatching | Self::Jaccard | Self::Tanimoto | Self::BinarySimilarity { .. }
        )
    }

    pub fn is_distance(&self) -> bool {
        !self.is_similarity()
    }
}

/// Per-field inner comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareFunction {
    #[default]
    AbsDiff,
    /// Gaussian similarity `exp(-ln(2) * z^2 / s^2)`; requires the field's
    /// similarity scale `s`.
    GaussSim,
    /// 0 when equal, 1 otherwise.
    Delta,
    /// 1 when equal, 0 otherwise.
    Equal,
    /// Recognized but not implemented.
    Table,
}

/// A measure plus its measure-level default compare function.
///
/// The measure-level function is limited to the attribute-less kinds
/// (AbsDiff, Delta, Equal); GaussSim and Table need per-field attributes and
/// may only appear on a [`ComparisonField`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMeasure {
    pub measure: Measure,
    pub compare_function: CompareFunction,
}

impl ComparisonMeasure {
    pub fn new(measure: Measure) -> Self {
        Self {
            measure,
            compare_function: CompareFunction::default(),
        }
    }
}

/// One compared field: weight, optional compare-function override, optional
/// Gaussian similarity scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonField {
    pub name: String,
    pub weight: f64,
    pub compare_function: Option<CompareFunction>,
    pub similarity_scale: Option<f64>,
}

impl ComparisonField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            compare_function: None,
            similarity_scale: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_compare_function(mut self, compare_function: CompareFunction) -> Self {
        self.compare_function = Some(compare_function);
        self
    }

    pub fn with_similarity_scale(mut self, scale: f64) -> Self {
        self.similarity_scale = Some(scale);
        self
    }
}

// =============================================================================
// Similarity
// =============================================================================

/// Convert a 0/1 value vector into a flag vector.
///
/// Anything that compares equal to neither 0 nor 1 is an evaluation failure.
pub fn to_flags(values: &[TypedValue]) -> Result<FixedBitSet> {
    let zero = TypedValue::double(0.0);
    let one = TypedValue::double(1.0);

    let mut flags = FixedBitSet::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        if value.equals_value(&one)? {
            flags.insert(i);
        } else if !value.equals_value(&zero)? {
            return Err(EvalError::Evaluation(format!(
                "similarity flag {} is neither 0 nor 1",
                value.format()
            )));
        }
    }

    Ok(flags)
}

/// Score a flag vector against a reference flag vector.
///
/// Tallies the four contingency counts and computes the measure's ratio. A
/// zero denominator is an invalid result.
pub fn evaluate_similarity(
    comparison_measure: &ComparisonMeasure,
    fields: &[ComparisonField],
    flags: &FixedBitSet,
    reference_flags: &FixedBitSet,
) -> Result<f64> {
    let mut a11 = 0.0;
    let mut a10 = 0.0;
    let mut a01 = 0.0;
    let mut a00 = 0.0;

    for i in 0..fields.len() {
        match (flags.contains(i), reference_flags.contains(i)) {
            (true, true) => a11 += 1.0,
            (true, false) => a10 += 1.0,
            (false, true) => a01 += 1.0,
            (false, false) => a00 += 1.0,
        }
    }

    let (numerator, denominator) = match comparison_measure.measure {
        Measure::SimpleMatching => (a11 + a00, a11 + a10 + a01 + a00),
        Measure::Jaccard => (a11, a11 + a10 + a01),
        Measure::Tanimoto => (a11 + a00, a11 + 2.0 * (a10 + a01) + a00),
        Measure::BinarySimilarity {
            c11,
            c10,
            c01,
            c00,
            d11,
            d10,
            d01,
            d00,
        } => (
            c11 * a11 + c10 * a10 + c01 * a01 + c00 * a00,
            d11 * a11 + d10 * a10 + d01 * a01 + d00 * a00,
        ),
        Measure::Euclidean
        | Measure::SquaredEuclidean
        | Measure::Chebychev
        | Measure::CityBlock
        | Measure::Minkowski { .. } => {
            return Err(EvalError::UnsupportedFeature(format!(
                "{:?} is not a similarity measure",
                comparison_measure.measure
            )))
        }
    };

    if denominator == 0.0 {
        return Err(EvalError::InvalidResult(
            "similarity denominator is zero".into(),
        ));
    }

    Ok(numerator / denominator)
}

// =============================================================================
// Distance
// =============================================================================

/// Score a value vector against a reference vector.
///
/// Fields whose input value is absent are skipped. Each inner distance is
/// raised to the measure's inner power and weighted by the field weight; the
/// aggregate (sum-then-root, or max for Chebychev) is scaled by the supplied
/// `adjustment` factor.
pub fn evaluate_distance(
    comparison_measure: &ComparisonMeasure,
    fields: &[ComparisonField],
    values: &[Option<TypedValue>],
    reference_values: &[TypedValue],
    adjustment: f64,
) -> Result<f64> {
    let (inner_power, outer_power) = match comparison_measure.measure {
        Measure::Euclidean => (2.0, 2.0),
        Measure::SquaredEuclidean => (2.0, 1.0),
        Measure::Chebychev | Measure::CityBlock => (1.0, 1.0),
        Measure::Minkowski { p } => {
            if p < 0.0 {
                return Err(EvalError::InvalidFeature(format!(
                    "Minkowski exponent must be non-negative, got {p}"
                )));
            }
            (p, p)
        }
        Measure::SimpleMatching
        | Measure::Jaccard
        | Measure::Tanimoto
        | Measure::BinarySimilarity { .. } => {
            return Err(EvalError::UnsupportedFeature(format!(
                "{:?} is not a distance measure",
                comparison_measure.measure
            )))
        }
    };

    let mut distances = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let Some(value) = values[i].as_ref() else {
            continue;
        };
        let reference = &reference_values[i];

        distances.push(inner_distance(
            comparison_measure,
            field,
            value,
            reference,
            inner_power,
        )?);
    }

    match comparison_measure.measure {
        Measure::Chebychev => {
            let max = distances
                .into_iter()
                .reduce(f64::max)
                .ok_or_else(|| EvalError::InvalidResult("no comparable fields".into()))?;
            Ok(max * adjustment)
        }
        _ => {
            let sum: f64 = distances.iter().sum();
            Ok((sum * adjustment).powf(1.0 / outer_power))
        }
    }
}

fn inner_distance(
    comparison_measure: &ComparisonMeasure,
    field: &ComparisonField,
    value: &TypedValue,
    reference: &TypedValue,
    power: f64,
) -> Result<f64> {
    let compare_function = match field.compare_function {
        Some(function) => function,
        None => {
            let function = comparison_measure.compare_function;
            // The measure-level default is limited to attribute-less kinds.
            match function {
                CompareFunction::AbsDiff | CompareFunction::Delta | CompareFunction::Equal => {}
                CompareFunction::GaussSim | CompareFunction::Table => {
                    return Err(EvalError::InvalidFeature(format!(
                        "{function:?} cannot be a measure-level compare function"
                    )))
                }
            }
            function
        }
    };

    let distance = match compare_function {
        CompareFunction::AbsDiff => difference(value, reference)?.abs(),
        CompareFunction::GaussSim => {
            let scale = field.similarity_scale.ok_or_else(|| {
                EvalError::InvalidFeature(format!(
                    "field {} uses gaussSim without a similarity scale",
                    field.name
                ))
            })?;
            let z = difference(value, reference)?;
            (-f64::ln(2.0) * z.powi(2) / scale.powi(2)).exp()
        }
        CompareFunction::Delta => {
            if value.equals_value(reference)? {
                0.0
            } else {
                1.0
            }
        }
        CompareFunction::Equal => {
            if value.equals_value(reference)? {
                1.0
            } else {
                0.0
            }
        }
        CompareFunction::Table => {
            return Err(EvalError::UnsupportedFeature(
                "table compare function".into(),
            ))
        }
    };

    Ok(field.weight * distance.powf(power))
}

fn difference(a: &TypedValue, b: &TypedValue) -> Result<f64> {
    Ok(a.as_number()? - b.as_number()?)
}

// =============================================================================
// Missing-value adjustment
// =============================================================================

/// Compensation factor for distances computed over partially missing input.
///
/// Returns the sum of all field weights over the sum of weights at
/// non-absent positions (unit weights when `adjustment_values` is absent).
/// Four values with one absent and unit weights yield `4/3`.
pub fn calculate_adjustment(
    values: &[Option<TypedValue>],
    adjustment_values: Option<&[f64]>,
) -> Result<f64> {
    let mut sum = 0.0;
    let mut nonmissing_sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        let weight = adjustment_values.map_or(1.0, |weights| weights[i]);
        sum += weight;
        if value.is_some() {
            nonmissing_sum += weight;
        }
    }

    if nonmissing_sum == 0.0 {
        return Err(EvalError::InvalidResult(
            "all compared values are missing".into(),
        ));
    }

    Ok(sum / nonmissing_sum)
}
