//! The immutable typed value threaded through every computation.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

use super::coerce;
use super::types::{DataType, OpType, Payload};

/// A raw value together with its declared type and operational category.
///
/// Created once per resolved field occurrence and never mutated. The payload
/// is never absent: a missing value is represented by the absence of a
/// `TypedValue` binding, never by a `TypedValue` holding an empty payload.
///
/// Comparisons across differing declared types promote both sides to the
/// wider type first (see [`coerce::widen`]).
///
/// # Example
///
/// ```
/// use modeleval::value::{DataType, OpType, Payload, TypedValue};
///
/// let a = TypedValue::continuous(DataType::Integer, Payload::Integer(3));
/// let b = TypedValue::continuous(DataType::Double, Payload::Double(3.0));
/// assert!(a.equals_value(&b).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    op_type: OpType,
    data_type: DataType,
    payload: Payload,
}

impl TypedValue {
    /// Create a value with an explicit operational category.
    pub fn new(op_type: OpType, data_type: DataType, payload: Payload) -> Self {
        Self {
            op_type,
            data_type,
            payload,
        }
    }

    /// Create a continuous value.
    pub fn continuous(data_type: DataType, payload: Payload) -> Self {
        Self::new(OpType::Continuous, data_type, payload)
    }

    /// Create a categorical value.
    pub fn categorical(data_type: DataType, payload: Payload) -> Self {
        Self::new(OpType::Categorical, data_type, payload)
    }

    /// Create a categorical string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::categorical(DataType::String, Payload::String(value.into()))
    }

    /// Create a continuous double value.
    pub fn double(value: f64) -> Self {
        Self::continuous(DataType::Double, Payload::Double(value))
    }

    /// Create a continuous integer value.
    pub fn integer(value: i64) -> Self {
        Self::continuous(DataType::Integer, Payload::Integer(value))
    }

    /// Parse a string under a declared type and category.
    pub fn parse(op_type: OpType, data_type: DataType, string: &str) -> Result<Self> {
        Ok(Self::new(op_type, data_type, coerce::parse(data_type, string)?))
    }

    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consume the value, returning its payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// String representation of the payload, via [`coerce::format`].
    pub fn format(&self) -> String {
        coerce::format(&self.payload)
    }

    // =========================================================================
    // Accessors
    // =========================================================================
    //
    // Each accessor fails with a type mismatch if the payload's runtime
    // representation does not match. Date/time accessors allow a DateTime to
    // be narrowed to its date or time part, and a Date to widen to a DateTime
    // at midnight; the widening is single-direction.

    pub fn as_string(&self) -> Result<&str> {
        match &self.payload {
            Payload::String(v) => Ok(v),
            other => Err(self.mismatch(DataType::String, other)),
        }
    }

    pub fn as_integer(&self) -> Result<i64> {
        match &self.payload {
            Payload::Integer(v) => Ok(*v),
            other => Err(self.mismatch(DataType::Integer, other)),
        }
    }

    /// Numeric view; accepts any numeric payload.
    pub fn as_number(&self) -> Result<f64> {
        self.payload
            .as_f64()
            .ok_or_else(|| self.mismatch(DataType::Double, &self.payload))
    }

    pub fn as_boolean(&self) -> Result<bool> {
        match &self.payload {
            Payload::Boolean(v) => Ok(*v),
            other => Err(self.mismatch(DataType::Boolean, other)),
        }
    }

    pub fn as_date(&self) -> Result<NaiveDate> {
        match &self.payload {
            Payload::Date(v) => Ok(*v),
            Payload::DateTime(v) => Ok(v.date()),
            other => Err(self.mismatch(DataType::Date, other)),
        }
    }

    pub fn as_time(&self) -> Result<NaiveTime> {
        match &self.payload {
            Payload::Time(v) => Ok(*v),
            Payload::DateTime(v) => Ok(v.time()),
            other => Err(self.mismatch(DataType::Time, other)),
        }
    }

    pub fn as_datetime(&self) -> Result<NaiveDateTime> {
        match &self.payload {
            Payload::DateTime(v) => Ok(*v),
            Payload::Date(v) => Ok(v.and_hms_opt(0, 0, 0).expect("midnight is always valid")),
            other => Err(self.mismatch(DataType::DateTime, other)),
        }
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Check equality against another value, widening first.
    pub fn equals_value(&self, other: &TypedValue) -> Result<bool> {
        let data_type = coerce::widen(self.data_type, other.data_type)?;
        coerce::equals(data_type, &self.payload, &other.payload)
    }

    /// Calculate the order against another value, widening first.
    pub fn compare_value(&self, other: &TypedValue) -> Result<Ordering> {
        let data_type = coerce::widen(self.data_type, other.data_type)?;
        coerce::compare(data_type, &self.payload, &other.payload)
    }

    /// Check equality against a reference string, parsed under this value's
    /// own declared type.
    pub fn equals_string(&self, string: &str) -> Result<bool> {
        let reference = coerce::parse(self.data_type, string)?;
        coerce::equals(self.data_type, &self.payload, &reference)
    }

    /// Calculate the order against a reference string, parsed under this
    /// value's own declared type.
    pub fn compare_to_string(&self, string: &str) -> Result<Ordering> {
        let reference = coerce::parse(self.data_type, string)?;
        coerce::compare(self.data_type, &self.payload, &reference)
    }

    fn mismatch(&self, expected: DataType, actual: &Payload) -> EvalError {
        EvalError::type_mismatch(expected.to_string(), actual.data_type().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_check_representation() {
        let value = TypedValue::double(1.5);
        assert_eq!(value.as_number().unwrap(), 1.5);
        assert!(value.as_string().is_err());
        assert!(value.as_boolean().is_err());
    }

    #[test]
    fn integer_is_a_number_but_not_vice_versa() {
        let int = TypedValue::integer(3);
        assert_eq!(int.as_integer().unwrap(), 3);
        assert_eq!(int.as_number().unwrap(), 3.0);

        let double = TypedValue::double(3.0);
        assert!(double.as_integer().is_err());
    }

    #[test]
    fn datetime_narrows_to_date_and_time() {
        let value = TypedValue::parse(
            OpType::Continuous,
            DataType::DateTime,
            "2013-04-01T08:30:00",
        )
        .unwrap();

        assert_eq!(value.as_date().unwrap().to_string(), "2013-04-01");
        assert_eq!(value.as_time().unwrap().to_string(), "08:30:00");
    }

    #[test]
    fn date_widens_to_midnight_datetime_only() {
        let date = TypedValue::parse(OpType::Continuous, DataType::Date, "2013-04-01").unwrap();
        assert_eq!(
            date.as_datetime().unwrap().to_string(),
            "2013-04-01 00:00:00"
        );
        // A time alone never widens to a full timestamp.
        let time = TypedValue::parse(OpType::Continuous, DataType::Time, "08:30:00").unwrap();
        assert!(time.as_datetime().is_err());
    }

    #[test]
    fn compare_is_antisymmetric() {
        let a = TypedValue::integer(1);
        let b = TypedValue::double(2.0);
        assert_eq!(a.compare_value(&b).unwrap(), Ordering::Less);
        assert_eq!(b.compare_value(&a).unwrap(), Ordering::Greater);
    }

    #[test]
    fn equals_matches_compare_equal() {
        let a = TypedValue::integer(2);
        let b = TypedValue::double(2.0);
        assert!(a.equals_value(&b).unwrap());
        assert_eq!(a.compare_value(&b).unwrap(), Ordering::Equal);
    }

    #[test]
    fn string_comparison_uses_own_type() {
        let value = TypedValue::double(0.5);
        assert!(value.equals_string("0.5").unwrap());
        assert!(!value.equals_string("0.25").unwrap());
        // The reference string is parsed under Double, not compared textually.
        assert!(value.equals_string("not-a-number").is_err());
    }
}
