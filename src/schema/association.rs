//! Association-rule description: items, itemsets, rules.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

use super::output::RankBasis;

/// A single basket item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub value: String,
}

/// A named set of item references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itemset {
    pub id: String,
    pub item_refs: Vec<String>,
}

/// One mined rule: antecedent itemset implies consequent itemset.
///
/// Support and confidence are always present; lift, leverage, and affinity
/// are optional statistics. Ranking on a statistic a rule does not carry is
/// an invalid-feature failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub id: Option<String>,
    /// Itemset id of the left-hand side.
    pub antecedent: String,
    /// Itemset id of the right-hand side.
    pub consequent: String,
    pub support: f64,
    pub confidence: f64,
    pub lift: Option<f64>,
    pub leverage: Option<f64>,
    pub affinity: Option<f64>,
}

impl AssociationRule {
    /// The statistic used when ranking by `basis`.
    pub fn rank_key(&self, basis: RankBasis) -> Result<f64> {
        let key = match basis {
            RankBasis::Confidence => Some(self.confidence),
            RankBasis::Support => Some(self.support),
            RankBasis::Lift => self.lift,
            RankBasis::Leverage => self.leverage,
            RankBasis::Affinity => self.affinity,
        };

        key.ok_or_else(|| {
            EvalError::InvalidFeature(format!(
                "rule {} carries no {basis:?} statistic",
                self.id.as_deref().unwrap_or("<anonymous>")
            ))
        })
    }
}
