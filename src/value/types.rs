//! Declared types, operational categories, and runtime payloads.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// The fixed data type a field is declared to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Integer,
    Float,
    Double,
    Boolean,
    Date,
    Time,
    DateTime,
}

impl DataType {
    /// Returns true for the numeric types that participate in widening.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Double)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "dateTime",
        };
        f.write_str(name)
    }
}

/// Whether a field's values are continuous, categorical, or ordinal.
///
/// Governs which measures and defaults apply; residual computation branches
/// on the target field's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpType {
    #[default]
    Continuous,
    Categorical,
    Ordinal,
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Continuous => "continuous",
            Self::Categorical => "categorical",
            Self::Ordinal => "ordinal",
        };
        f.write_str(name)
    }
}

/// Owned runtime representation of a field value.
///
/// One variant per [`DataType`]. A payload is never "empty": missingness is
/// represented by the absence of a binding, not by a payload variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    String(String),
    Integer(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Payload {
    /// The data type this payload naturally carries.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Boolean(_) => DataType::Boolean,
            Self::Date(_) => DataType::Date,
            Self::Time(_) => DataType::Time,
            Self::DateTime(_) => DataType::DateTime,
        }
    }

    /// Numeric view of the payload, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}
