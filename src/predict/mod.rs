//! Prediction results and the evaluation pipelines.
//!
//! A model-kind evaluator (tree walker, clustering scorer, rule lookup)
//! produces raw [`Prediction`]s, hands them to the target pipeline to
//! normalize, then to the output pipeline to materialize the declared
//! output fields.
//!
//! # Quick Start
//!
//! ```
//! use indexmap::IndexMap;
//! use modeleval::context::EvaluationContext;
//! use modeleval::predict::{self, Distribution, DistributionKind, Prediction};
//! use modeleval::schema::{ModelSchema, OutputField, ResultFeature};
//!
//! struct NoCatalog;
//! impl modeleval::context::FieldCatalog for NoCatalog {
//!     fn data_field(&self, _: &str) -> Option<&modeleval::schema::FieldDecl> { None }
//!     fn derived_field(&self, _: &str) -> Option<&modeleval::schema::DerivedField> { None }
//!     fn function(&self, _: &str) -> Option<&modeleval::schema::FunctionDef> { None }
//! }
//!
//! let schema = ModelSchema::new()
//!     .with_target_field("outcome")
//!     .with_output_field(
//!         OutputField::new("p", ResultFeature::Probability).with_value("above-normal"),
//!     );
//!
//! let distribution = Distribution::new(DistributionKind::Probability)
//!     .with_entry("above-normal", 0.8)
//!     .with_entry("normal", 0.2);
//! let predictions = IndexMap::from([(
//!     "outcome".to_string(),
//!     Some(Prediction::Distribution(distribution)),
//! )]);
//!
//! let catalog = NoCatalog;
//! let mut ctx = EvaluationContext::new(&catalog, IndexMap::new());
//! let result = predict::evaluate_outputs(&predictions, &schema, &mut ctx).unwrap();
//! # let _ = result;
//! ```

pub mod expression;
mod input;
mod output;
mod result;
mod target;

pub use input::{prepare, RawValue};
pub use output::evaluate_outputs;
pub use result::{
    AssociationResult, Distribution, DistributionKind, EntityAssignment, EntityKind, Prediction,
    PredictionMap, ScoredValue,
};
pub use target::{
    evaluate_classification, evaluate_regression, evaluate_regression_value, process,
    target_value_for,
};

use indexmap::IndexMap;

use crate::error::Result;
use crate::value::TypedValue;

/// A computed output value: a scalar, or an ordered sequence of values
/// (multi-valued rule features, item lists, accumulated warnings).
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Scalar(TypedValue),
    List(Vec<OutputValue>),
}

impl OutputValue {
    /// The scalar inside, if this is one.
    pub fn as_scalar(&self) -> Option<&TypedValue> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// The list inside, if this is one.
    pub fn as_list(&self) -> Option<&[OutputValue]> {
        match self {
            Self::Scalar(_) => None,
            Self::List(values) => Some(values),
        }
    }
}

/// One entry of an evaluation result: either a raw prediction carried over
/// from the model-kind evaluator, or a computed output field value.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCell {
    Prediction(Option<Prediction>),
    Output(Option<OutputValue>),
}

impl OutputCell {
    pub fn as_prediction(&self) -> Option<&Prediction> {
        match self {
            Self::Prediction(prediction) => prediction.as_ref(),
            Self::Output(_) => None,
        }
    }

    pub fn as_output(&self) -> Option<&OutputValue> {
        match self {
            Self::Prediction(_) => None,
            Self::Output(value) => value.as_ref(),
        }
    }
}

/// The top-level contract implemented by each model-kind evaluator.
pub trait Evaluator {
    /// Prepare one input value: convert to the field's declared type and
    /// apply missing/invalid/outlier treatment.
    fn prepare(&self, name: &str, value: Option<&RawValue>) -> Result<Option<TypedValue>>;

    /// Evaluate prepared arguments into predicted and output field values.
    fn evaluate(
        &self,
        arguments: &IndexMap<String, Option<RawValue>>,
    ) -> Result<IndexMap<String, OutputCell>>;
}
