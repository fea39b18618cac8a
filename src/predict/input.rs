//! Input normalization: user-supplied values to typed field values.
//!
//! [`prepare`] converts a raw value to the field's declared type and applies
//! the mining field's missing-value, invalid-value, and outlier treatments,
//! in that order.

use crate::error::Result;
use crate::schema::{FieldDecl, InvalidValueTreatment, MiningField, OutlierTreatment};
use crate::value::{coerce, DataType, OpType, Payload, TypedValue};

/// A field value in user-supplied representation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_owned())
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Double(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

/// Prepare one input value for evaluation.
///
/// A missing input takes the mining field's replacement value, when one is
/// declared. Strings are parsed under the field's declared type; a value
/// that fails to convert goes through the invalid-value treatment. For
/// continuous fields an outlier treatment may clamp or blank values outside
/// `[low, high]`.
pub fn prepare(
    field: &FieldDecl,
    mining_field: Option<&MiningField>,
    raw: Option<&RawValue>,
) -> Result<Option<TypedValue>> {
    let Some(raw) = raw else {
        return match mining_field.and_then(|m| m.missing_value_replacement.as_deref()) {
            Some(replacement) => {
                Ok(Some(TypedValue::parse(field.op_type, field.data_type, replacement)?))
            }
            None => Ok(None),
        };
    };

    let converted = convert(field, raw);

    let value = match converted {
        Ok(value) => value,
        Err(error) => {
            let treatment = mining_field
                .map(|m| m.invalid_value_treatment)
                .unwrap_or_default();
            match treatment {
                InvalidValueTreatment::ReturnInvalid => return Err(error),
                InvalidValueTreatment::AsMissing => return Ok(None),
                // Keep the value in its supplied representation.
                InvalidValueTreatment::AsIs => TypedValue::new(
                    field.op_type,
                    DataType::String,
                    Payload::String(raw_to_string(raw)),
                ),
            }
        }
    };

    apply_outlier_treatment(field, mining_field, value)
}

fn convert(field: &FieldDecl, raw: &RawValue) -> Result<TypedValue> {
    let payload = match raw {
        RawValue::String(string) => coerce::parse(field.data_type, string)?,
        RawValue::Integer(value) => coerce::cast(field.data_type, Payload::Integer(*value))?,
        RawValue::Double(value) => coerce::cast(field.data_type, Payload::Double(*value))?,
        RawValue::Boolean(value) => coerce::cast(field.data_type, Payload::Boolean(*value))?,
    };

    Ok(TypedValue::new(field.op_type, field.data_type, payload))
}

fn apply_outlier_treatment(
    field: &FieldDecl,
    mining_field: Option<&MiningField>,
    value: TypedValue,
) -> Result<Option<TypedValue>> {
    let Some(mining_field) = mining_field else {
        return Ok(Some(value));
    };

    if field.op_type != OpType::Continuous
        || mining_field.outlier_treatment == OutlierTreatment::AsIs
    {
        return Ok(Some(value));
    }

    let number = value.as_number()?;
    let below = mining_field.low.filter(|low| number < *low);
    let above = mining_field.high.filter(|high| number > *high);

    if below.is_none() && above.is_none() {
        return Ok(Some(value));
    }

    match mining_field.outlier_treatment {
        OutlierTreatment::AsMissingValues => Ok(None),
        OutlierTreatment::AsExtremeValues => {
            let clamped = below.or(above).unwrap_or(number);
            let payload = coerce::cast(field.data_type, Payload::Double(clamped))?;
            Ok(Some(TypedValue::new(field.op_type, field.data_type, payload)))
        }
        OutlierTreatment::AsIs => Ok(Some(value)),
    }
}

fn raw_to_string(raw: &RawValue) -> String {
    match raw {
        RawValue::String(value) => value.clone(),
        RawValue::Integer(value) => value.to_string(),
        RawValue::Double(value) => value.to_string(),
        RawValue::Boolean(value) => value.to_string(),
    }
}
