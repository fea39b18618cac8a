//! modeleval: a declarative predictive-model evaluation engine.
//!
//! Given an immutable, previously parsed model description and a set of
//! input field values, this crate computes predicted values and the declared
//! derived output values (probabilities, residuals, entity identifiers,
//! affinities, reason codes, association-rule features), applying target
//! post-processing (clipping, rescaling, default and prior-probability
//! substitution).
//!
//! The crate is the shared framework model-kind evaluators build on; the
//! evaluators themselves (tree walker, clustering scorer, rule lookup) live
//! outside and supply capability-bearing [`predict::Prediction`] results.
//!
//! # Key Types
//!
//! - [`TypedValue`] - immutable value with declared type and category
//! - [`EvaluationContext`] - frame stack, field/function resolution, warnings
//! - [`predict::Prediction`] - raw results and their capability contracts
//! - [`predict::evaluate_outputs`] / [`predict::evaluate_regression`] /
//!   [`predict::evaluate_classification`] - the two pipelines
//! - [`schema`] - the read-only model description (targets, output fields,
//!   matrices, sparse arrays)
//! - [`measure`] - similarity and distance over field-value vectors
//!
//! # Evaluating
//!
//! A model-kind evaluator implements [`predict::Evaluator`]: it prepares the
//! inputs with [`predict::prepare`], computes its raw predictions, runs them
//! through the target pipeline, and materializes output fields with
//! [`predict::evaluate_outputs`] under a per-call [`EvaluationContext`].
//!
//! # Concurrency
//!
//! The model description is immutable and freely shared across concurrent
//! evaluations; each call owns its private context. The sparse-array decode
//! cache is the one shared structure and tolerates concurrent
//! recompute-on-miss.

pub mod context;
pub mod error;
pub mod measure;
pub mod predict;
pub mod schema;
pub mod value;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use context::{EvaluationContext, FieldCatalog};
pub use error::{EvalError, Result};
pub use value::{DataType, OpType, Payload, TypedValue};
