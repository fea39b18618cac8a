//! Integration tests for the target and output pipelines.
//!
//! Each test builds a small model description by hand, supplies raw
//! predictions the way a model-kind evaluator would, and checks the
//! materialized output fields.

use indexmap::IndexMap;

use modeleval::context::{EvaluationContext, FieldCatalog};
use modeleval::predict::{
    self, AssociationResult, Distribution, DistributionKind, EntityAssignment, EntityKind,
    Prediction, PredictionMap, RawValue, ScoredValue,
};
use modeleval::schema::{
    AssociationRule, DerivedField, Expression, FieldDecl, FunctionDef, Item, Itemset, ModelSchema,
    OutputField, RankBasis, RankOrder, ResultFeature, RuleFeature, Target, TargetValue,
};
use modeleval::{EvalError, TypedValue};

// ============================================================================
// Test Model Builders
// ============================================================================

/// A catalog with one categorical target field and one continuous input.
struct Catalog {
    fields: Vec<FieldDecl>,
}

impl Catalog {
    fn new() -> Self {
        Self {
            fields: vec![
                FieldDecl::categorical("outcome"),
                FieldDecl::continuous("amount"),
            ],
        }
    }
}

impl FieldCatalog for Catalog {
    fn data_field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn derived_field(&self, _name: &str) -> Option<&DerivedField> {
        None
    }

    fn function(&self, _name: &str) -> Option<&FunctionDef> {
        None
    }
}

fn context<'a>(
    catalog: &'a Catalog,
    arguments: &[(&str, Option<TypedValue>)],
) -> EvaluationContext<'a> {
    let arguments = arguments
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    EvaluationContext::new(catalog, arguments)
}

fn outcome_distribution() -> Prediction {
    Prediction::Distribution(
        Distribution::new(DistributionKind::Probability)
            .with_entry("above-normal", 0.8)
            .with_entry("normal", 0.2),
    )
}

fn outcome_predictions() -> PredictionMap {
    IndexMap::from([("outcome".to_string(), Some(outcome_distribution()))])
}

fn scalar(result: &IndexMap<String, predict::OutputCell>, name: &str) -> TypedValue {
    result[name]
        .as_output()
        .and_then(predict::OutputValue::as_scalar)
        .cloned()
        .unwrap_or_else(|| panic!("no scalar output for {name}"))
}

// ============================================================================
// Probability and predicted value
// ============================================================================

#[test]
fn probability_and_predicted_value() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(
            OutputField::new("p_above", ResultFeature::Probability).with_value("above-normal"),
        )
        .with_output_field(OutputField::new("label", ResultFeature::PredictedValue));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "p_above").as_number().unwrap(), 0.8);
    assert_eq!(scalar(&result, "label").as_string().unwrap(), "above-normal");

    // The raw prediction survives the merge.
    assert!(result["outcome"].as_prediction().is_some());
}

#[test]
fn unspecified_feature_defaults_to_predicted_value() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(OutputField::new("copy", ResultFeature::default()));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "copy").as_string().unwrap(), "above-normal");
}

#[test]
fn missing_prediction_for_target_field_fails() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("elsewhere")
        .with_output_field(OutputField::new("p", ResultFeature::Probability).with_value("x"));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx);

    assert!(matches!(result, Err(EvalError::MissingField(_))));
}

#[test]
fn capability_mismatch_fails_typed() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(OutputField::new("cluster", ResultFeature::ClusterId));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx);

    assert!(matches!(result, Err(EvalError::TypeMismatch { .. })));
}

// ============================================================================
// Residuals
// ============================================================================

#[test]
fn categorical_residual_subtracts_winner_probability() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(OutputField::new("residual", ResultFeature::Residual));

    // Expected "yes", predicted "no" with probability 0.7.
    let predictions = IndexMap::from([(
        "outcome".to_string(),
        Some(Prediction::Distribution(
            Distribution::new(DistributionKind::Probability)
                .with_entry("no", 0.7)
                .with_entry("yes", 0.3),
        )),
    )]);

    let mut ctx = context(&catalog, &[("outcome", Some(TypedValue::string("yes")))]);
    let result = predict::evaluate_outputs(&predictions, &schema, &mut ctx).unwrap();

    let residual = scalar(&result, "residual").as_number().unwrap();
    assert!((residual - (0.0 - 0.7)).abs() < 1e-12);
}

#[test]
fn continuous_residual_is_expected_minus_predicted() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("amount")
        .with_output_field(OutputField::new("residual", ResultFeature::Residual));

    let predictions = IndexMap::from([(
        "amount".to_string(),
        Some(Prediction::Value(TypedValue::double(8.0))),
    )]);

    let mut ctx = context(&catalog, &[("amount", Some(TypedValue::double(10.0)))]);
    let result = predict::evaluate_outputs(&predictions, &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "residual").as_number().unwrap(), 2.0);
}

#[test]
fn residual_needs_the_original_input() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(OutputField::new("residual", ResultFeature::Residual));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx);

    assert!(matches!(result, Err(EvalError::MissingField(_))));
}

// ============================================================================
// Entities, affinities, reason codes
// ============================================================================

fn cluster_predictions() -> PredictionMap {
    IndexMap::from([(
        "segment".to_string(),
        Some(Prediction::Entities(
            EntityAssignment::new(EntityKind::Cluster)
                .with_entity("c3", 1.2)
                .with_entity("c1", 2.5)
                .with_entity("c2", 4.1),
        )),
    )])
}

#[test]
fn ranked_entity_lookups() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("segment")
        .with_output_field(OutputField::new("winner", ResultFeature::EntityId))
        .with_output_field(OutputField::new("second", ResultFeature::EntityId).with_rank(2))
        .with_output_field(OutputField::new("cluster", ResultFeature::ClusterId))
        .with_output_field(OutputField::new("closeness", ResultFeature::ClusterAffinity))
        .with_output_field(
            OutputField::new("third_affinity", ResultFeature::Affinity).with_rank(3),
        );

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&cluster_predictions(), &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "winner").as_string().unwrap(), "c3");
    assert_eq!(scalar(&result, "second").as_string().unwrap(), "c1");
    assert_eq!(scalar(&result, "cluster").as_string().unwrap(), "c3");
    assert_eq!(scalar(&result, "closeness").as_number().unwrap(), 1.2);
    assert_eq!(scalar(&result, "third_affinity").as_number().unwrap(), 4.1);
}

#[test]
fn rank_past_the_ranking_is_absent_not_an_error() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("segment")
        .with_output_field(OutputField::new("tenth", ResultFeature::EntityId).with_rank(10));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&cluster_predictions(), &schema, &mut ctx).unwrap();

    assert!(result["tenth"].as_output().is_none());
}

#[test]
fn non_positive_rank_is_invalid() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("segment")
        .with_output_field(OutputField::new("bad", ResultFeature::EntityId).with_rank(0));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&cluster_predictions(), &schema, &mut ctx);

    assert!(matches!(result, Err(EvalError::InvalidFeature(_))));
}

#[test]
fn reason_codes_come_from_the_score() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("risk")
        .with_output_field(OutputField::new("rc1", ResultFeature::ReasonCode))
        .with_output_field(OutputField::new("rc2", ResultFeature::ReasonCode).with_rank(2));

    let predictions = IndexMap::from([(
        "risk".to_string(),
        Some(Prediction::Score(ScoredValue::new(
            29.0,
            vec!["RC_AGE".into(), "RC_INCOME".into()],
        ))),
    )]);

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&predictions, &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "rc1").as_string().unwrap(), "RC_AGE");
    assert_eq!(scalar(&result, "rc2").as_string().unwrap(), "RC_INCOME");
}

// ============================================================================
// Association rules
// ============================================================================

fn basket_predictions() -> PredictionMap {
    let items = [
        Item {
            id: "i1".into(),
            value: "beer".into(),
        },
        Item {
            id: "i2".into(),
            value: "crisps".into(),
        },
        Item {
            id: "i3".into(),
            value: "wine".into(),
        },
    ];
    let itemsets = [
        Itemset {
            id: "s1".into(),
            item_refs: vec!["i1".into()],
        },
        Itemset {
            id: "s2".into(),
            item_refs: vec!["i2".into()],
        },
        Itemset {
            id: "s3".into(),
            item_refs: vec!["i1".into(), "i3".into()],
        },
    ];
    let rule = |id: &str, antecedent: &str, consequent: &str, confidence: f64| AssociationRule {
        id: Some(id.into()),
        antecedent: antecedent.into(),
        consequent: consequent.into(),
        support: 0.1,
        confidence,
        lift: None,
        leverage: None,
        affinity: None,
    };
    let rules = vec![
        rule("r1", "s1", "s2", 0.9),
        rule("r2", "s2", "s3", 0.5),
        rule("r3", "s3", "s2", 0.7),
    ];

    IndexMap::from([(
        "basket".to_string(),
        Some(Prediction::Rules(AssociationResult::new(items, itemsets, rules))),
    )])
}

#[test]
fn single_rule_by_descending_confidence_rank() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("basket")
        .with_output_field(
            OutputField::new("second_best", ResultFeature::RuleValue)
                .with_ranking(RankBasis::Confidence, RankOrder::Descending)
                .with_rank(2)
                .with_rule_feature(RuleFeature::Confidence),
        );

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&basket_predictions(), &schema, &mut ctx).unwrap();

    // Confidences 0.9, 0.5, 0.7 ranked descending: second is 0.7.
    assert_eq!(scalar(&result, "second_best").as_number().unwrap(), 0.7);
}

#[test]
fn rule_projections() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("basket")
        .with_output_field(
            OutputField::new("best_rule", ResultFeature::RuleValue)
                .with_rule_feature(RuleFeature::Rule),
        )
        .with_output_field(
            OutputField::new("best_id", ResultFeature::RuleValue)
                .with_rule_feature(RuleFeature::RuleId),
        )
        .with_output_field(
            OutputField::new("third_antecedent", ResultFeature::RuleValue)
                .with_rank(3)
                .with_rule_feature(RuleFeature::Antecedent),
        );

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&basket_predictions(), &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "best_rule").as_string().unwrap(), "{beer}->{crisps}");
    assert_eq!(scalar(&result, "best_id").as_string().unwrap(), "r1");

    // Third by descending confidence is r2, whose antecedent is {crisps}.
    let antecedent = result["third_antecedent"].as_output().unwrap().as_list().unwrap();
    assert_eq!(antecedent.len(), 1);
    assert_eq!(antecedent[0].as_scalar().unwrap().as_string().unwrap(), "crisps");
}

#[test]
fn multi_valued_rules_return_first_n() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("basket")
        .with_output_field(
            OutputField::new("top_two", ResultFeature::RuleValue)
                .multi_valued(true)
                .with_rank(2)
                .with_rule_feature(RuleFeature::Confidence),
        )
        .with_output_field(
            OutputField::new("all", ResultFeature::RuleValue)
                .multi_valued(true)
                .with_rank(0)
                .with_rule_feature(RuleFeature::Confidence),
        );

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&basket_predictions(), &schema, &mut ctx).unwrap();

    let top_two = result["top_two"].as_output().unwrap().as_list().unwrap();
    let confidences: Vec<f64> = top_two
        .iter()
        .map(|value| value.as_scalar().unwrap().as_number().unwrap())
        .collect();
    assert_eq!(confidences, vec![0.9, 0.7]);

    let all = result["all"].as_output().unwrap().as_list().unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn rule_rank_past_the_list_is_absent() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("basket")
        .with_output_field(
            OutputField::new("tenth", ResultFeature::RuleValue)
                .with_rank(10)
                .with_rule_feature(RuleFeature::Confidence),
        );

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&basket_predictions(), &schema, &mut ctx).unwrap();

    assert!(result["tenth"].as_output().is_none());
}

// ============================================================================
// Chained output fields, transformed values, warnings
// ============================================================================

#[test]
fn outputs_chain_through_the_frame() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(
            OutputField::new("p_above", ResultFeature::Probability).with_value("above-normal"),
        )
        .with_output_field(
            OutputField::new("p_percent", ResultFeature::TransformedValue).with_expression(
                Expression::apply(
                    "*",
                    vec![Expression::field_ref("p_above"), Expression::constant("100")],
                ),
            ),
        );

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "p_percent").as_number().unwrap(), 80.0);
    // The pass's frame is gone once evaluation completes.
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn transformed_value_requires_an_expression() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(OutputField::new("t", ResultFeature::TransformedValue));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx);

    assert!(matches!(result, Err(EvalError::InvalidFeature(_))));
}

#[test]
fn warnings_surface_through_the_output() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(OutputField::new("diagnostics", ResultFeature::Warning));

    let mut ctx = context(&catalog, &[]);
    ctx.record_warning("value of amount treated as missing");

    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx).unwrap();

    let warnings = result["diagnostics"].as_output().unwrap().as_list().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].as_scalar().unwrap().as_string().unwrap(),
        "value of amount treated as missing"
    );
}

#[test]
fn failed_pass_leaves_no_frames_behind() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_output_field(
            OutputField::new("p", ResultFeature::Probability).with_value("above-normal"),
        )
        .with_output_field(OutputField::new("boom", ResultFeature::ClusterId));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx);

    assert!(result.is_err());
    assert_eq!(ctx.depth(), 0);
}

// ============================================================================
// Display values and the target pipeline end to end
// ============================================================================

#[test]
fn display_value_prefers_capability_then_target_entry() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("segment")
        .with_output_field(OutputField::new("shown", ResultFeature::PredictedDisplayValue));

    let predictions = IndexMap::from([(
        "segment".to_string(),
        Some(Prediction::Entities(
            EntityAssignment::new(EntityKind::Cluster)
                .with_entity("c1", 0.4)
                .with_display_value("young adults"),
        )),
    )]);

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&predictions, &schema, &mut ctx).unwrap();
    assert_eq!(scalar(&result, "shown").as_string().unwrap(), "young adults");

    // No capability display value: the target entry's display wins.
    let schema = ModelSchema::new()
        .with_target_field("outcome")
        .with_target(Target::new("outcome").with_value(TargetValue {
            value: Some("above-normal".into()),
            display_value: Some("Above normal".into()),
            ..Default::default()
        }))
        .with_output_field(OutputField::new("shown", ResultFeature::PredictedDisplayValue));

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&outcome_predictions(), &schema, &mut ctx).unwrap();
    assert_eq!(scalar(&result, "shown").as_string().unwrap(), "Above normal");
}

#[test]
fn regression_target_then_outputs() {
    let catalog = Catalog::new();
    let schema = ModelSchema::new()
        .with_target_field("amount")
        .with_target(
            Target::new("amount")
                .with_bounds(Some(0.0), Some(10.0))
                .with_rescale(1.0, 0.0),
        )
        .with_output_field(OutputField::new("final", ResultFeature::PredictedValue));

    let predictions = predict::evaluate_regression_value(Some(12.0), &schema).unwrap();

    let mut ctx = context(&catalog, &[]);
    let result = predict::evaluate_outputs(&predictions, &schema, &mut ctx).unwrap();

    assert_eq!(scalar(&result, "final").as_number().unwrap(), 10.0);
}

// ============================================================================
// Input preparation
// ============================================================================

#[test]
fn prepare_feeds_the_context() {
    let catalog = Catalog::new();
    let field = catalog.data_field("amount").unwrap();

    let prepared = predict::prepare(field, None, Some(&RawValue::String("12.5".into()))).unwrap();
    let ctx = context(&catalog, &[("amount", prepared)]);

    assert_eq!(
        ctx.lookup("amount").unwrap().unwrap().as_number().unwrap(),
        12.5
    );
}
