//! Computation of declared output fields from raw predictions.
//!
//! Output fields are evaluated in declaration order inside one frame; each
//! computed scalar is bound into that frame so later output fields can
//! reference it by name. After the pass, computed values are merged over a
//! copy of the raw predictions (computed values win on key collision).
//!
//! The frame is released on every exit path; a failure discards whatever
//! the pass had bound so far.

use indexmap::IndexMap;

use crate::context::EvaluationContext;
use crate::error::{EvalError, Result};
use crate::schema::{
    AssociationRule, ModelSchema, OutputField, RankOrder, ResultFeature, RuleFeature,
};
use crate::value::{coerce, OpType, TypedValue};

use super::expression;
use super::result::{AssociationResult, Prediction, PredictionMap};
use super::target::target_value_for;
use super::{OutputCell, OutputValue};

/// Materialize the declared output fields over a set of raw predictions.
pub fn evaluate_outputs(
    predictions: &PredictionMap,
    schema: &ModelSchema,
    ctx: &mut EvaluationContext<'_>,
) -> Result<IndexMap<String, OutputCell>> {
    log::debug!(
        "evaluating {} output fields over {} predictions",
        schema.output_fields.len(),
        predictions.len()
    );

    let (computed, _frame) = ctx.with_frame(|ctx| {
        let mut computed: Vec<(String, Option<OutputValue>)> =
            Vec::with_capacity(schema.output_fields.len());

        for output_field in &schema.output_fields {
            let raw = compute(output_field, predictions, schema, ctx)?;
            let value = raw.map(|value| finalize(output_field, value)).transpose()?;

            // The result of one output field becomes visible to the next.
            if let Some(OutputValue::Scalar(scalar)) = &value {
                ctx.bind(output_field.name.clone(), scalar.clone());
            }

            computed.push((output_field.name.clone(), value));
        }

        Ok(computed)
    })?;

    let mut result: IndexMap<String, OutputCell> = predictions
        .iter()
        .map(|(name, prediction)| (name.clone(), OutputCell::Prediction(prediction.clone())))
        .collect();

    for (name, value) in computed {
        result.insert(name, OutputCell::Output(value));
    }

    Ok(result)
}

/// Dispatch one output field on its requested result feature.
fn compute(
    output_field: &OutputField,
    predictions: &PredictionMap,
    schema: &ModelSchema,
    ctx: &mut EvaluationContext<'_>,
) -> Result<Option<OutputValue>> {
    let target_field = output_field
        .target_field
        .as_deref()
        .or(schema.target_field.as_deref());

    match output_field.feature {
        ResultFeature::PredictedValue => {
            let prediction = source(predictions, target_field, output_field)?;
            decoded(prediction).map(|value| value.map(OutputValue::Scalar))
        }
        ResultFeature::PredictedDisplayValue => {
            let prediction = source(predictions, target_field, output_field)?;
            display_value(prediction, target_field, schema)
        }
        ResultFeature::TransformedValue | ResultFeature::Decision => {
            let expression = output_field.expression.as_ref().ok_or_else(|| {
                EvalError::InvalidFeature(format!(
                    "output field {} requests a transformed value without an expression",
                    output_field.name
                ))
            })?;
            Ok(expression::evaluate(expression, ctx)?.map(OutputValue::Scalar))
        }
        ResultFeature::Probability => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            let class = output_field.value.as_deref().ok_or_else(|| {
                EvalError::InvalidFeature(format!(
                    "output field {} requests a probability without a class value",
                    output_field.name
                ))
            })?;
            Ok(Some(scalar_double(prediction.probability(class)?)))
        }
        ResultFeature::Residual => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            residual(prediction, target_field, output_field, ctx)
        }
        ResultFeature::EntityId => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            let rank = checked_rank(output_field)?;
            let entities = prediction.as_entities()?;

            if rank > 1 {
                Ok(ranked(entities.entity_id_ranking(), rank)
                    .map(|id| scalar_string(id.clone())))
            } else {
                Ok(Some(scalar_string(entities.entity_id()?)))
            }
        }
        ResultFeature::ClusterId => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            Ok(Some(scalar_string(prediction.as_entities()?.cluster_id()?)))
        }
        ResultFeature::Affinity | ResultFeature::EntityAffinity => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            let rank = checked_rank(output_field)?;
            let entities = prediction.as_entities()?;

            if rank > 1 {
                let ranking = entities.affinity_ranking()?;
                Ok(ranked(&ranking, rank).map(|affinity| scalar_double(*affinity)))
            } else {
                let affinity = match output_field.value.as_deref() {
                    Some(class) => entities.affinity(class)?,
                    None => entities.winner_affinity()?,
                };
                Ok(Some(scalar_double(affinity)))
            }
        }
        ResultFeature::ClusterAffinity => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            Ok(Some(scalar_double(
                prediction.as_entities()?.cluster_affinity()?,
            )))
        }
        ResultFeature::ReasonCode => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            let rank = checked_rank(output_field)?;
            let ranking = prediction.as_score()?.reason_code_ranking();
            Ok(ranked(ranking, rank).map(|code| scalar_string(code.clone())))
        }
        ResultFeature::RuleValue => {
            let prediction = require(source(predictions, target_field, output_field)?)?;
            rule_value(prediction.as_rules()?, output_field)
        }
        ResultFeature::Warning => {
            let warnings = ctx
                .warnings()
                .iter()
                .map(|warning| scalar_string(warning.clone()))
                .collect();
            Ok(Some(OutputValue::List(warnings)))
        }
    }
}

// =============================================================================
// Source prediction resolution
// =============================================================================

/// Resolve the raw prediction an output field reads.
///
/// The target field must be present in the prediction map; its value may
/// still be absent.
fn source<'p>(
    predictions: &'p PredictionMap,
    target_field: Option<&str>,
    output_field: &OutputField,
) -> Result<Option<&'p Prediction>> {
    let name = target_field.ok_or_else(|| {
        EvalError::MissingField(format!(
            "output field {} names no target field and the model has none",
            output_field.name
        ))
    })?;

    match predictions.get(name) {
        Some(prediction) => Ok(prediction.as_ref()),
        None => Err(EvalError::MissingField(format!(
            "output field {} reads {name}, which holds no prediction",
            output_field.name
        ))),
    }
}

/// A capability check against an absent prediction fails like any other
/// failed capability cast.
fn require(prediction: Option<&Prediction>) -> Result<&Prediction> {
    prediction.ok_or_else(|| EvalError::type_mismatch("a prediction result", "an absent result"))
}

fn decoded(prediction: Option<&Prediction>) -> Result<Option<TypedValue>> {
    prediction.map(Prediction::decode).transpose()
}

// =============================================================================
// Per-feature computations
// =============================================================================

fn display_value(
    prediction: Option<&Prediction>,
    target_field: Option<&str>,
    schema: &ModelSchema,
) -> Result<Option<OutputValue>> {
    if let Some(display) = prediction.and_then(Prediction::display_value) {
        return Ok(Some(scalar_string(display)));
    }

    let Some(decoded) = decoded(prediction)? else {
        return Ok(None);
    };

    if let Some(target) = target_field.and_then(|name| schema.target(name)) {
        if let Some(entry) = target_value_for(target, &decoded)? {
            if let Some(display) = &entry.display_value {
                return Ok(Some(scalar_string(display.clone())));
            }
        }
    }

    Ok(Some(OutputValue::Scalar(decoded)))
}

fn residual(
    prediction: &Prediction,
    target_field: Option<&str>,
    output_field: &OutputField,
    ctx: &EvaluationContext<'_>,
) -> Result<Option<OutputValue>> {
    // target_field is known present: `source` already resolved it.
    let name = target_field.unwrap_or_default();

    let expected = ctx.get_argument(name).cloned().ok_or_else(|| {
        EvalError::MissingField(format!(
            "output field {} needs an input value for {name}",
            output_field.name
        ))
    })?;

    let field = ctx
        .catalog()
        .data_field(name)
        .ok_or_else(|| EvalError::MissingField(name.to_owned()))?;

    let residual = match field.op_type {
        OpType::Continuous => expected.as_number()? - prediction.decode()?.as_number()?,
        OpType::Categorical => {
            let distribution = prediction.as_distribution()?;
            let predicted = prediction.decode()?.format();
            let matches = expected.format() == predicted;
            (if matches { 1.0 } else { 0.0 }) - distribution.probability(&predicted)?
        }
        OpType::Ordinal => {
            return Err(EvalError::UnsupportedFeature(format!(
                "residuals over ordinal field {name}"
            )))
        }
    };

    Ok(Some(scalar_double(residual)))
}

fn rule_value(
    rules: &AssociationResult,
    output_field: &OutputField,
) -> Result<Option<OutputValue>> {
    let selected = rules.rules(output_field.algorithm);

    // Rank keys up front so an absent statistic fails before sorting.
    let mut keyed: Vec<(f64, &AssociationRule)> = selected
        .into_iter()
        .map(|rule| Ok((rule.rank_key(output_field.rank_basis)?, rule)))
        .collect::<Result<_>>()?;

    keyed.sort_by(|a, b| {
        let order = a.0.total_cmp(&b.0);
        match output_field.rank_order {
            RankOrder::Ascending => order,
            RankOrder::Descending => order.reverse(),
        }
    });

    if !output_field.multi_valued {
        let rank = checked_rank(output_field)?;
        return keyed
            .get(rank as usize - 1)
            .map(|(_, rule)| rule_feature(rules, rule, output_field))
            .transpose();
    }

    let rank = output_field.rank;
    if rank < 0 {
        return Err(EvalError::InvalidFeature(format!(
            "output field {} declares a negative rank",
            output_field.name
        )));
    }

    // A zero rank asks for all matching rules.
    let size = if rank == 0 {
        keyed.len()
    } else {
        keyed.len().min(rank as usize)
    };

    let values = keyed[..size]
        .iter()
        .map(|(_, rule)| rule_feature(rules, rule, output_field))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(OutputValue::List(values)))
}

fn rule_feature(
    rules: &AssociationResult,
    rule: &AssociationRule,
    output_field: &OutputField,
) -> Result<OutputValue> {
    let statistic = |value: Option<f64>, name: &str| -> Result<OutputValue> {
        value.map(scalar_double).ok_or_else(|| {
            EvalError::InvalidFeature(format!("selected rule carries no {name} statistic"))
        })
    };

    match output_field.rule_feature {
        RuleFeature::Antecedent => item_list(rules, &rule.antecedent),
        RuleFeature::Consequent => item_list(rules, &rule.consequent),
        RuleFeature::Rule => {
            let antecedent = rules.item_values(&rule.antecedent)?.join(",");
            let consequent = rules.item_values(&rule.consequent)?.join(",");
            Ok(scalar_string(format!("{{{antecedent}}}->{{{consequent}}}")))
        }
        RuleFeature::RuleId => {
            let id = rules.rule_id(rule).ok_or_else(|| {
                EvalError::InvalidFeature("selected rule has no identifier".into())
            })?;
            Ok(scalar_string(id))
        }
        RuleFeature::Confidence => Ok(scalar_double(rule.confidence)),
        RuleFeature::Support => Ok(scalar_double(rule.support)),
        RuleFeature::Lift => statistic(rule.lift, "lift"),
        RuleFeature::Leverage => statistic(rule.leverage, "leverage"),
        RuleFeature::Affinity => statistic(rule.affinity, "affinity"),
    }
}

fn item_list(rules: &AssociationResult, itemset_id: &str) -> Result<OutputValue> {
    let values = rules
        .item_values(itemset_id)?
        .into_iter()
        .map(scalar_string)
        .collect();
    Ok(OutputValue::List(values))
}

// =============================================================================
// Helpers
// =============================================================================

/// Ranked features demand a positive 1-based rank.
fn checked_rank(output_field: &OutputField) -> Result<i64> {
    if output_field.rank <= 0 {
        return Err(EvalError::InvalidFeature(format!(
            "output field {} declares rank {}, expected >= 1",
            output_field.name, output_field.rank
        )));
    }
    Ok(output_field.rank)
}

/// A rank beyond the available list is not an error; the result is absent.
fn ranked<T>(elements: &[T], rank: i64) -> Option<&T> {
    elements.get(rank as usize - 1)
}

fn scalar_string(value: impl Into<String>) -> OutputValue {
    OutputValue::Scalar(TypedValue::string(value))
}

fn scalar_double(value: f64) -> OutputValue {
    OutputValue::Scalar(TypedValue::double(value))
}

/// Re-wrap a computed scalar under the output field's declared type.
fn finalize(output_field: &OutputField, value: OutputValue) -> Result<OutputValue> {
    match value {
        OutputValue::Scalar(scalar) => {
            let payload = match output_field.data_type {
                Some(data_type) => coerce::cast(data_type, scalar.into_payload())?,
                None => scalar.into_payload(),
            };
            let data_type = payload.data_type();
            Ok(OutputValue::Scalar(TypedValue::new(
                output_field.op_type,
                data_type,
                payload,
            )))
        }
        list => Ok(list),
    }
}
