//! Parsing, formatting, comparison, and widening across type boundaries.
//!
//! All cross-type operations in the crate funnel through here so that the
//! promotion rules stay in one place. The promotion order for numeric types
//! is fixed: `Integer < Float < Double`. Any non-numeric mismatch is an
//! error, never an implicit string coercion.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{EvalError, Result};

use super::types::{DataType, Payload};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a string into a payload of the given declared type.
///
/// Parsing failures report the offending string and the target type.
pub fn parse(data_type: DataType, string: &str) -> Result<Payload> {
    let mismatch = || EvalError::type_mismatch(data_type.to_string(), format!("{string:?}"));

    let payload = match data_type {
        DataType::String => Payload::String(string.to_owned()),
        DataType::Integer => Payload::Integer(string.parse::<i64>().map_err(|_| mismatch())?),
        DataType::Float => Payload::Float(string.parse::<f32>().map_err(|_| mismatch())?),
        DataType::Double => Payload::Double(string.parse::<f64>().map_err(|_| mismatch())?),
        DataType::Boolean => match string {
            "true" => Payload::Boolean(true),
            "false" => Payload::Boolean(false),
            _ => return Err(mismatch()),
        },
        DataType::Date => {
            Payload::Date(NaiveDate::parse_from_str(string, DATE_FORMAT).map_err(|_| mismatch())?)
        }
        DataType::Time => {
            Payload::Time(NaiveTime::parse_from_str(string, TIME_FORMAT).map_err(|_| mismatch())?)
        }
        DataType::DateTime => Payload::DateTime(
            NaiveDateTime::parse_from_str(string, DATE_TIME_FORMAT).map_err(|_| mismatch())?,
        ),
    };

    Ok(payload)
}

/// Format a payload back into its string representation.
///
/// Round-trips with [`parse`] under the payload's own data type.
pub fn format(payload: &Payload) -> String {
    match payload {
        Payload::String(v) => v.clone(),
        Payload::Integer(v) => v.to_string(),
        Payload::Float(v) => v.to_string(),
        Payload::Double(v) => v.to_string(),
        Payload::Boolean(v) => v.to_string(),
        Payload::Date(v) => v.format(DATE_FORMAT).to_string(),
        Payload::Time(v) => v.format(TIME_FORMAT).to_string(),
        Payload::DateTime(v) => v.format(DATE_TIME_FORMAT).to_string(),
    }
}

/// The wider of two declared types, under the fixed promotion order.
///
/// Identical types widen to themselves. For numeric pairs the result is the
/// type with the greater rank (`Integer < Float < Double`). Everything else
/// is a type mismatch.
pub fn widen(a: DataType, b: DataType) -> Result<DataType> {
    if a == b {
        return Ok(a);
    }

    fn rank(data_type: DataType) -> Option<u8> {
        match data_type {
            DataType::Integer => Some(0),
            DataType::Float => Some(1),
            DataType::Double => Some(2),
            _ => None,
        }
    }

    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => Ok(if ra >= rb { a } else { b }),
        _ => Err(EvalError::type_mismatch(a.to_string(), b.to_string())),
    }
}

/// Calculate the order between two payloads read through the given type.
///
/// Numeric payloads are promoted to the comparison type first, so comparing
/// a `Double` to an `Integer` under `Double` reads both as `f64`. Floats
/// compare under total order.
pub fn compare(data_type: DataType, a: &Payload, b: &Payload) -> Result<Ordering> {
    match data_type {
        DataType::String => Ok(as_str(a)?.cmp(as_str(b)?)),
        DataType::Integer => Ok(as_i64(a)?.cmp(&as_i64(b)?)),
        DataType::Float | DataType::Double => Ok(as_f64(a)?.total_cmp(&as_f64(b)?)),
        DataType::Boolean => Ok(as_bool(a)?.cmp(&as_bool(b)?)),
        DataType::Date => Ok(as_date(a)?.cmp(&as_date(b)?)),
        DataType::Time => Ok(as_time(a)?.cmp(&as_time(b)?)),
        DataType::DateTime => Ok(as_datetime(a)?.cmp(&as_datetime(b)?)),
    }
}

/// Check two payloads for equality read through the given type.
pub fn equals(data_type: DataType, a: &Payload, b: &Payload) -> Result<bool> {
    Ok(compare(data_type, a, b)? == Ordering::Equal)
}

/// Re-type a computed payload under a declared type.
///
/// String payloads are parsed; numeric payloads widen (never narrow); any
/// other conversion is a type mismatch. Used when binding an output value
/// under the output field's declared type.
pub fn cast(data_type: DataType, payload: Payload) -> Result<Payload> {
    if payload.data_type() == data_type {
        return Ok(payload);
    }

    if let Payload::String(string) = &payload {
        return parse(data_type, string);
    }

    match (data_type, &payload) {
        (DataType::String, _) => Ok(Payload::String(format(&payload))),
        (DataType::Float, Payload::Integer(v)) => Ok(Payload::Float(*v as f32)),
        (DataType::Double, Payload::Integer(v)) => Ok(Payload::Double(*v as f64)),
        (DataType::Double, Payload::Float(v)) => Ok(Payload::Double(*v as f64)),
        _ => Err(EvalError::type_mismatch(
            data_type.to_string(),
            payload.data_type().to_string(),
        )),
    }
}

// =============================================================================
// Typed payload views
// =============================================================================

fn view_error(expected: DataType, payload: &Payload) -> EvalError {
    EvalError::type_mismatch(expected.to_string(), payload.data_type().to_string())
}

fn as_str(payload: &Payload) -> Result<&str> {
    match payload {
        Payload::String(v) => Ok(v),
        _ => Err(view_error(DataType::String, payload)),
    }
}

fn as_i64(payload: &Payload) -> Result<i64> {
    match payload {
        Payload::Integer(v) => Ok(*v),
        _ => Err(view_error(DataType::Integer, payload)),
    }
}

fn as_f64(payload: &Payload) -> Result<f64> {
    payload
        .as_f64()
        .ok_or_else(|| view_error(DataType::Double, payload))
}

fn as_bool(payload: &Payload) -> Result<bool> {
    match payload {
        Payload::Boolean(v) => Ok(*v),
        _ => Err(view_error(DataType::Boolean, payload)),
    }
}

fn as_date(payload: &Payload) -> Result<NaiveDate> {
    match payload {
        Payload::Date(v) => Ok(*v),
        _ => Err(view_error(DataType::Date, payload)),
    }
}

fn as_time(payload: &Payload) -> Result<NaiveTime> {
    match payload {
        Payload::Time(v) => Ok(*v),
        _ => Err(view_error(DataType::Time, payload)),
    }
}

fn as_datetime(payload: &Payload) -> Result<NaiveDateTime> {
    match payload {
        Payload::DateTime(v) => Ok(*v),
        _ => Err(view_error(DataType::DateTime, payload)),
    }
}
