//! Shared error types for model evaluation.
//!
//! Every detected inconsistency surfaces as a typed [`EvalError`]; there are
//! no internal retries. A failure aborts the current evaluation call and any
//! partially computed output frame is discarded on unwind. Non-fatal issues
//! go through [`crate::context::EvaluationContext::record_warning`] instead.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while evaluating a model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    /// A structurally required attribute is absent or self-contradictory in
    /// the model description.
    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    /// The model description uses a construct this engine recognizes but
    /// does not implement a computation for.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A runtime value does not match the type an accessor or capability
    /// check required.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A computation needs a prediction or argument value that is not
    /// present in the currently available bindings.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A prediction result was asked for a derived scalar before any
    /// decision was reached.
    #[error("missing result: {0}")]
    MissingResult(String),

    /// A computation produced a value outside its valid domain.
    #[error("invalid result: {0}")]
    InvalidResult(String),

    /// Runtime evaluation inconsistency not covered by the other kinds.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

impl EvalError {
    /// Build a [`EvalError::TypeMismatch`] from an expectation and the value
    /// actually seen.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
