//! Raw prediction results and their capability contracts.
//!
//! A model-kind evaluator produces one [`Prediction`] per target field. Each
//! variant carries exactly the data its capabilities need; the output
//! pipeline matches on the variant instead of performing dynamic casts.
//! Requesting a capability a variant does not carry is a type-check
//! failure, never a silent default.

use indexmap::IndexMap;

use crate::error::{EvalError, Result};
use crate::schema::{AssociationRule, Item, Itemset, RuleAlgorithm};
use crate::value::TypedValue;

/// Map of target field name to raw prediction.
///
/// A `None` entry records that the model produced no result for the field
/// (the target pipeline may substitute a default or prior distribution).
pub type PredictionMap = IndexMap<String, Option<Prediction>>;

/// A raw prediction produced by a model-kind evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// A plain value: regression output, rule-set score, decoded simple
    /// result.
    Value(TypedValue),
    /// A distribution over class values.
    Distribution(Distribution),
    /// An entity assignment with ranked alternatives (clustering, nearest
    /// neighbors).
    Entities(EntityAssignment),
    /// A scored result with ranked reason codes (scorecards).
    Score(ScoredValue),
    /// Association-rule lookup results.
    Rules(AssociationResult),
}

impl Prediction {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "a plain value",
            Self::Distribution(_) => "a class distribution",
            Self::Entities(_) => "an entity assignment",
            Self::Score(_) => "a scored value",
            Self::Rules(_) => "an association result",
        }
    }

    /// Decode to the simple representation: the value itself, a winning
    /// class or entity identifier, a score.
    ///
    /// Association results have no simple representation.
    pub fn decode(&self) -> Result<TypedValue> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Distribution(distribution) => {
                Ok(TypedValue::string(distribution.result()?.0))
            }
            Self::Entities(entities) => Ok(TypedValue::string(entities.entity_id()?)),
            Self::Score(score) => Ok(TypedValue::double(score.value())),
            Self::Rules(_) => Err(EvalError::Evaluation(
                "an association result has no simple representation".into(),
            )),
        }
    }

    /// The capability-provided display value, if the variant carries one.
    pub fn display_value(&self) -> Option<&str> {
        match self {
            Self::Entities(entities) => entities.display_value(),
            _ => None,
        }
    }

    // =========================================================================
    // Capability checks
    // =========================================================================

    pub fn as_distribution(&self) -> Result<&Distribution> {
        match self {
            Self::Distribution(distribution) => Ok(distribution),
            other => Err(other.capability_mismatch("a class distribution")),
        }
    }

    pub fn as_entities(&self) -> Result<&EntityAssignment> {
        match self {
            Self::Entities(entities) => Ok(entities),
            other => Err(other.capability_mismatch("an entity assignment")),
        }
    }

    pub fn as_score(&self) -> Result<&ScoredValue> {
        match self {
            Self::Score(score) => Ok(score),
            other => Err(other.capability_mismatch("a scored value")),
        }
    }

    pub fn as_rules(&self) -> Result<&AssociationResult> {
        match self {
            Self::Rules(rules) => Ok(rules),
            other => Err(other.capability_mismatch("an association result")),
        }
    }

    /// Probability of a class value; requires a probability distribution.
    pub fn probability(&self, class: &str) -> Result<f64> {
        self.as_distribution()?.probability(class)
    }

    fn capability_mismatch(&self, expected: &str) -> EvalError {
        EvalError::type_mismatch(expected, self.kind_name())
    }
}

// =============================================================================
// Distribution
// =============================================================================

/// What the per-class numbers of a [`Distribution`] mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Probability,
    Confidence,
    Similarity,
    /// Smaller is better; the winner is the minimum.
    Distance,
    Vote,
}

/// A distribution of scores over class values, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    kind: DistributionKind,
    values: IndexMap<String, f64>,
}

impl Distribution {
    pub fn new(kind: DistributionKind) -> Self {
        Self {
            kind,
            values: IndexMap::new(),
        }
    }

    pub fn with_entry(mut self, class: impl Into<String>, value: f64) -> Self {
        self.values.insert(class.into(), value);
        self
    }

    pub fn insert(&mut self, class: impl Into<String>, value: f64) {
        self.values.insert(class.into(), value);
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    pub fn values(&self) -> &IndexMap<String, f64> {
        &self.values
    }

    /// The winning class and its score.
    ///
    /// The winner is the maximum entry, or the minimum for distance
    /// distributions; ties keep the earliest entry. Asking an empty
    /// distribution is a missing-result failure.
    pub fn result(&self) -> Result<(&str, f64)> {
        let better = |candidate: f64, winner: f64| match self.kind {
            DistributionKind::Distance => candidate < winner,
            _ => candidate > winner,
        };

        let mut entries = self.values.iter();
        let mut winner = entries
            .next()
            .ok_or_else(|| EvalError::MissingResult("empty distribution".into()))?;

        for entry in entries {
            if better(*entry.1, *winner.1) {
                winner = entry;
            }
        }

        Ok((winner.0, *winner.1))
    }

    /// Probability of a class value.
    ///
    /// Requires a probability distribution; a class the distribution does
    /// not mention is a missing-field failure.
    pub fn probability(&self, class: &str) -> Result<f64> {
        if self.kind != DistributionKind::Probability {
            return Err(EvalError::type_mismatch(
                "a probability distribution",
                format!("a {:?} distribution", self.kind).to_lowercase(),
            ));
        }

        self.values
            .get(class)
            .copied()
            .ok_or_else(|| EvalError::MissingField(class.to_owned()))
    }
}

// =============================================================================
// Entity assignment
// =============================================================================

/// Whether an entity assignment names clusters or neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Cluster,
    Neighbor,
}

/// Ranked entity identifiers with per-entity affinities.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAssignment {
    kind: EntityKind,
    /// Entity identifiers, best first.
    ranking: Vec<String>,
    affinities: IndexMap<String, f64>,
    display_value: Option<String>,
}

impl EntityAssignment {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            ranking: Vec::new(),
            affinities: IndexMap::new(),
            display_value: None,
        }
    }

    /// Append the next-ranked entity.
    pub fn with_entity(mut self, id: impl Into<String>, affinity: f64) -> Self {
        let id = id.into();
        self.ranking.push(id.clone());
        self.affinities.insert(id, affinity);
        self
    }

    pub fn with_display_value(mut self, display_value: impl Into<String>) -> Self {
        self.display_value = Some(display_value.into());
        self
    }

    /// The winning entity identifier; missing-result when nothing ranked.
    pub fn entity_id(&self) -> Result<&str> {
        self.ranking
            .first()
            .map(String::as_str)
            .ok_or_else(|| EvalError::MissingResult("no ranked entities".into()))
    }

    pub fn entity_id_ranking(&self) -> &[String] {
        &self.ranking
    }

    /// Affinity of a specific entity.
    pub fn affinity(&self, id: &str) -> Result<f64> {
        self.affinities
            .get(id)
            .copied()
            .ok_or_else(|| EvalError::MissingField(id.to_owned()))
    }

    /// Affinity of the winning entity.
    pub fn winner_affinity(&self) -> Result<f64> {
        self.affinity(self.entity_id()?)
    }

    /// Affinities in ranking order.
    pub fn affinity_ranking(&self) -> Result<Vec<f64>> {
        self.ranking.iter().map(|id| self.affinity(id)).collect()
    }

    /// The winning cluster identifier; clusters only.
    pub fn cluster_id(&self) -> Result<&str> {
        self.require_cluster()?;
        self.entity_id()
    }

    /// Affinity of the winning cluster; clusters only.
    pub fn cluster_affinity(&self) -> Result<f64> {
        self.require_cluster()?;
        self.winner_affinity()
    }

    pub fn display_value(&self) -> Option<&str> {
        self.display_value.as_deref()
    }

    fn require_cluster(&self) -> Result<()> {
        match self.kind {
            EntityKind::Cluster => Ok(()),
            EntityKind::Neighbor => Err(EvalError::type_mismatch(
                "a cluster assignment",
                "a neighbor assignment",
            )),
        }
    }
}

// =============================================================================
// Scored value
// =============================================================================

/// A numeric score with ranked reason codes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredValue {
    value: f64,
    reason_codes: Vec<String>,
}

impl ScoredValue {
    pub fn new(value: f64, reason_codes: Vec<String>) -> Self {
        Self {
            value,
            reason_codes,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reason_code_ranking(&self) -> &[String] {
        &self.reason_codes
    }
}

// =============================================================================
// Association result
// =============================================================================

/// Association-rule lookup results with their item/itemset/rule registries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssociationResult {
    items: IndexMap<String, Item>,
    itemsets: IndexMap<String, Itemset>,
    rules: Vec<AssociationRule>,
    /// Registry of rule identifier to rule index, for rules whose own `id`
    /// is absent.
    rule_ids: IndexMap<String, usize>,
    /// Per-algorithm rule selections, supplied by the model-kind evaluator.
    recommendations: Vec<usize>,
    exclusive_recommendations: Vec<usize>,
}

impl AssociationResult {
    pub fn new(
        items: impl IntoIterator<Item = Item>,
        itemsets: impl IntoIterator<Item = Itemset>,
        rules: Vec<AssociationRule>,
    ) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            itemsets: itemsets.into_iter().map(|i| (i.id.clone(), i)).collect(),
            rules,
            rule_ids: IndexMap::new(),
            recommendations: Vec::new(),
            exclusive_recommendations: Vec::new(),
        }
    }

    pub fn with_rule_registry(mut self, ids: impl IntoIterator<Item = (String, usize)>) -> Self {
        self.rule_ids = ids.into_iter().collect();
        self
    }

    pub fn with_recommendations(mut self, plain: Vec<usize>, exclusive: Vec<usize>) -> Self {
        self.recommendations = plain;
        self.exclusive_recommendations = exclusive;
        self
    }

    /// The rules selected by an algorithm, in model order.
    pub fn rules(&self, algorithm: RuleAlgorithm) -> Vec<&AssociationRule> {
        let indices = match algorithm {
            RuleAlgorithm::RuleAssociation => return self.rules.iter().collect(),
            RuleAlgorithm::Recommendation => &self.recommendations,
            RuleAlgorithm::ExclusiveRecommendation => &self.exclusive_recommendations,
        };
        indices.iter().filter_map(|&i| self.rules.get(i)).collect()
    }

    /// A rule's identifier: its own, or the registry's, by reverse lookup.
    pub fn rule_id<'a>(&'a self, rule: &'a AssociationRule) -> Option<&'a str> {
        if let Some(id) = rule.id.as_deref() {
            return Some(id);
        }

        let index = self
            .rules
            .iter()
            .position(|candidate| std::ptr::eq(candidate, rule))?;
        self.rule_ids
            .iter()
            .find(|(_, &i)| i == index)
            .map(|(id, _)| id.as_str())
    }

    /// The item values referenced by an itemset, in reference order.
    pub fn item_values(&self, itemset_id: &str) -> Result<Vec<&str>> {
        let itemset = self.itemsets.get(itemset_id).ok_or_else(|| {
            EvalError::InvalidFeature(format!("unknown itemset {itemset_id:?}"))
        })?;

        itemset
            .item_refs
            .iter()
            .map(|item_ref| {
                self.items
                    .get(item_ref)
                    .map(|item| item.value.as_str())
                    .ok_or_else(|| {
                        EvalError::InvalidFeature(format!("unknown item {item_ref:?}"))
                    })
            })
            .collect()
    }
}
