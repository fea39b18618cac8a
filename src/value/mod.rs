//! Typed values and the type coercion library.
//!
//! - [`TypedValue`]: immutable value with declared type and operational
//!   category; all comparisons and conversions pass through it
//! - [`coerce`]: parse/format/compare/widen with fixed promotion rules
//! - [`DataType`] / [`OpType`] / [`Payload`]: the type vocabulary

pub mod coerce;
mod typed;
mod types;

pub use typed::TypedValue;
pub use types::{DataType, OpType, Payload};
