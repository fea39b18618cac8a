//! The expression language attached to output fields and derived fields.
//!
//! Deliberately small: constants, field references, and function application
//! (built-in arithmetic or catalog-defined functions). This is the surface
//! the TRANSFORMED_VALUE and DECISION output features evaluate.

use serde::{Deserialize, Serialize};

use crate::value::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expression {
    /// A literal, parsed under `data_type` (or inferred when absent:
    /// integer, then double, then string).
    Constant {
        value: String,
        data_type: Option<DataType>,
    },
    /// A reference resolved through the frame stack, the input arguments,
    /// and finally the derived-field catalog.
    FieldRef(String),
    /// A function application; `function` names a built-in or a catalog
    /// [`super::FunctionDef`].
    Apply {
        function: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn constant(value: impl Into<String>) -> Self {
        Expression::Constant {
            value: value.into(),
            data_type: None,
        }
    }

    pub fn typed_constant(value: impl Into<String>, data_type: DataType) -> Self {
        Expression::Constant {
            value: value.into(),
            data_type: Some(data_type),
        }
    }

    pub fn field_ref(name: impl Into<String>) -> Self {
        Expression::FieldRef(name.into())
    }

    pub fn apply(function: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Apply {
            function: function.into(),
            args,
        }
    }
}
