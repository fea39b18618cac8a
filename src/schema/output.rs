//! Declared output fields and the result-feature vocabulary.

use serde::{Deserialize, Serialize};

use crate::value::{DataType, OpType};

use super::expression::Expression;

/// The computation an output field requests from a raw prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultFeature {
    /// Copy of the target field value. The default when unspecified.
    #[default]
    PredictedValue,
    PredictedDisplayValue,
    TransformedValue,
    Decision,
    Probability,
    Residual,
    EntityId,
    ClusterId,
    Affinity,
    EntityAffinity,
    ClusterAffinity,
    ReasonCode,
    RuleValue,
    Warning,
}

/// Which aspect of a selected association rule to project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleFeature {
    Antecedent,
    #[default]
    Consequent,
    /// The whole rule formatted as `{a,b}->{c,d}`.
    Rule,
    RuleId,
    Confidence,
    Support,
    Lift,
    Leverage,
    Affinity,
}

/// The statistic association rules are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankBasis {
    #[default]
    Confidence,
    Support,
    Lift,
    Leverage,
    Affinity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankOrder {
    Ascending,
    #[default]
    Descending,
}

/// Which rule subset an association output draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleAlgorithm {
    Recommendation,
    ExclusiveRecommendation,
    #[default]
    RuleAssociation,
}

/// One declared output field.
///
/// Output fields are evaluated in declaration order; each computed value
/// becomes visible to subsequently declared output fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    /// Defaults to the model's primary predicted field when absent.
    pub target_field: Option<String>,
    pub op_type: OpType,
    /// Declared type the computed value is re-wrapped under; inferred from
    /// the value when absent.
    pub data_type: Option<DataType>,
    pub feature: ResultFeature,
    /// Class value filter, for probability-of-a-specific-class and friends.
    pub value: Option<String>,
    /// 1-based position for ranked features.
    pub rank: i64,
    pub rank_basis: RankBasis,
    pub rank_order: RankOrder,
    /// Single-result mode when false; first-N (0 meaning all) when true.
    pub multi_valued: bool,
    pub algorithm: RuleAlgorithm,
    pub rule_feature: RuleFeature,
    pub expression: Option<Expression>,
}

impl OutputField {
    /// An output field with the given name and feature, defaults elsewhere.
    pub fn new(name: impl Into<String>, feature: ResultFeature) -> Self {
        Self {
            name: name.into(),
            target_field: None,
            op_type: OpType::Continuous,
            data_type: None,
            feature,
            value: None,
            rank: 1,
            rank_basis: RankBasis::default(),
            rank_order: RankOrder::default(),
            multi_valued: false,
            algorithm: RuleAlgorithm::default(),
            rule_feature: RuleFeature::default(),
            expression: None,
        }
    }

    pub fn with_target_field(mut self, target_field: impl Into<String>) -> Self {
        self.target_field = Some(target_field.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_data_type(mut self, op_type: OpType, data_type: DataType) -> Self {
        self.op_type = op_type;
        self.data_type = Some(data_type);
        self
    }

    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn with_rule_feature(mut self, rule_feature: RuleFeature) -> Self {
        self.rule_feature = rule_feature;
        self
    }

    pub fn with_ranking(mut self, basis: RankBasis, order: RankOrder) -> Self {
        self.rank_basis = basis;
        self.rank_order = order;
        self
    }

    pub fn multi_valued(mut self, multi: bool) -> Self {
        self.multi_valued = multi;
        self
    }
}
