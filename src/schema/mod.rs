//! The read-only model description consumed by the pipelines.
//!
//! Everything in this module is immutable once constructed and shared,
//! read-only, across concurrent evaluations. Parsing the description from
//! its exchange format happens upstream; these are the in-memory shapes.

mod association;
mod expression;
mod field;
mod matrix;
mod output;
mod sparse;
mod target;

pub use association::{AssociationRule, Item, Itemset};
pub use expression::Expression;
pub use field::{
    DerivedField, FieldDecl, FunctionDef, InvalidValueTreatment, MiningField, OutlierTreatment,
};
pub use matrix::{MatCell, Matrix, MatrixKind};
pub use output::{
    OutputField, RankBasis, RankOrder, ResultFeature, RuleAlgorithm, RuleFeature,
};
pub use sparse::{IntSparseArray, RealSparseArray, SparseArray, SparseElement};
pub use target::{CastInteger, Target, TargetValue};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The declarations the pipelines read: primary target field, per-field
/// targets, ordered output fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSchema {
    /// The model's primary predicted field; output fields without an
    /// explicit target reference default to it.
    pub target_field: Option<String>,
    pub targets: IndexMap<String, Target>,
    pub output_fields: Vec<OutputField>,
}

impl ModelSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_field(mut self, name: impl Into<String>) -> Self {
        self.target_field = Some(name.into());
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.insert(target.field.clone(), target);
        self
    }

    pub fn with_output_field(mut self, output_field: OutputField) -> Self {
        self.output_fields.push(output_field);
        self
    }

    pub fn target(&self, field: &str) -> Option<&Target> {
        self.targets.get(field)
    }
}
