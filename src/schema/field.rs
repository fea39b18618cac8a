//! Field declarations and input-treatment directives.

use serde::{Deserialize, Serialize};

use crate::value::{DataType, OpType};

use super::expression::Expression;

/// A declared model field: name, operational category, data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub op_type: OpType,
    pub data_type: DataType,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, op_type: OpType, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            op_type,
            data_type,
        }
    }

    /// A continuous double field, the most common shape.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self::new(name, OpType::Continuous, DataType::Double)
    }

    /// A categorical string field.
    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, OpType::Categorical, DataType::String)
    }
}

/// A field defined by an expression over other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedField {
    pub decl: FieldDecl,
    pub expression: Expression,
}

/// A named function definition usable from expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub parameters: Vec<FieldDecl>,
    pub body: Expression,
}

/// How an unparseable input value is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidValueTreatment {
    /// Fail the evaluation with a type mismatch.
    #[default]
    ReturnInvalid,
    /// Keep the value as supplied.
    AsIs,
    /// Treat the value as missing.
    AsMissing,
}

/// How a continuous input outside `[low, high]` is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlierTreatment {
    #[default]
    AsIs,
    /// Blank the value.
    AsMissingValues,
    /// Clamp the value to the nearer bound.
    AsExtremeValues,
}

/// Per-field input directives applied by [`crate::predict::prepare`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MiningField {
    pub name: String,
    /// Replacement for a missing input, in string form; parsed under the
    /// field's declared type.
    pub missing_value_replacement: Option<String>,
    pub invalid_value_treatment: InvalidValueTreatment,
    pub outlier_treatment: OutlierTreatment,
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl MiningField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
