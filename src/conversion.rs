//! Value coercion between `RowValues` and Rust field types.
//!
//! The row mapper converts each column value into the declared type of the field it
//! lands in. Coercions follow what a relational client usually tolerates: numbers
//! parse from text, integers widen or narrow when the value fits, `0`/`1` act as
//! booleans, and timestamps parse from their common text layouts.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::types::{RowValues, TIMESTAMP_FORMAT, parse_timestamp};

/// A single value could not be coerced into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} to {target}")]
pub struct ConversionError {
    pub target: &'static str,
    pub found: String,
}

impl ConversionError {
    fn new(target: &'static str, value: &RowValues) -> Self {
        Self {
            target,
            found: value.to_string(),
        }
    }
}

/// Types a column value can be coerced into.
pub trait FromRowValue: Sized {
    /// Coerce a non-NULL value.
    ///
    /// # Errors
    /// Returns `ConversionError` when the value has no sensible representation in `Self`.
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError>;

    /// The representation of SQL NULL, for types that can hold absence.
    #[must_use]
    fn from_null() -> Option<Self> {
        None
    }
}

/// Types that can be written back out as a column value.
pub trait ToRowValue {
    fn to_row_value(&self) -> RowValues;
}

/// Coerce any value, NULL included.
///
/// NULL converts only for types whose `from_null` yields a value.
///
/// # Errors
/// Returns `ConversionError` if the value (or NULL) cannot be represented.
pub fn convert_value<T: FromRowValue>(value: &RowValues) -> Result<T, ConversionError> {
    if value.is_null() {
        T::from_null().ok_or_else(|| ConversionError::new(std::any::type_name::<T>(), value))
    } else {
        T::from_row_value(value)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_i64(value: &RowValues) -> Option<i64> {
    match value {
        RowValues::Int(i) => Some(*i),
        RowValues::Float(f) => float_to_i64(*f),
        RowValues::Bool(b) => Some(i64::from(*b)),
        RowValues::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
        }
        RowValues::JSON(JsonValue::Number(n)) => n.as_i64(),
        _ => None,
    }
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRowValue for $ty {
                fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
                    coerce_i64(value)
                        .and_then(|i| <$ty>::try_from(i).ok())
                        .ok_or_else(|| ConversionError::new(stringify!($ty), value))
                }
            }

            impl ToRowValue for $ty {
                fn to_row_value(&self) -> RowValues {
                    i64::try_from(*self).map_or_else(
                        |_| RowValues::Text(self.to_string()),
                        RowValues::Int,
                    )
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromRowValue for f64 {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        #[allow(clippy::cast_precision_loss)]
        let converted = match value {
            RowValues::Float(f) => Some(*f),
            RowValues::Int(i) => Some(*i as f64),
            RowValues::Text(s) => s.trim().parse::<f64>().ok(),
            RowValues::JSON(JsonValue::Number(n)) => n.as_f64(),
            _ => None,
        };
        converted.ok_or_else(|| ConversionError::new("f64", value))
    }
}

impl ToRowValue for f64 {
    fn to_row_value(&self) -> RowValues {
        RowValues::Float(*self)
    }
}

impl FromRowValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        f64::from_row_value(value)
            .map(|f| f as f32)
            .map_err(|_| ConversionError::new("f32", value))
    }
}

impl ToRowValue for f32 {
    fn to_row_value(&self) -> RowValues {
        RowValues::Float(f64::from(*self))
    }
}

impl FromRowValue for bool {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        let converted = match value {
            RowValues::Bool(b) => Some(*b),
            RowValues::Int(i) => Some(*i != 0),
            RowValues::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            RowValues::JSON(JsonValue::Bool(b)) => Some(*b),
            _ => None,
        };
        converted.ok_or_else(|| ConversionError::new("bool", value))
    }
}

impl ToRowValue for bool {
    fn to_row_value(&self) -> RowValues {
        RowValues::Bool(*self)
    }
}

impl FromRowValue for String {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        match value {
            RowValues::Text(s) => Ok(s.clone()),
            RowValues::Int(i) => Ok(i.to_string()),
            RowValues::Float(f) => Ok(f.to_string()),
            RowValues::Bool(b) => Ok(b.to_string()),
            RowValues::Timestamp(dt) => Ok(dt.format(TIMESTAMP_FORMAT).to_string()),
            RowValues::JSON(JsonValue::String(s)) => Ok(s.clone()),
            RowValues::JSON(v) => Ok(v.to_string()),
            RowValues::Blob(bytes) => String::from_utf8(bytes.clone())
                .map_err(|_| ConversionError::new("String", value)),
            RowValues::Null => Err(ConversionError::new("String", value)),
        }
    }
}

impl ToRowValue for String {
    fn to_row_value(&self) -> RowValues {
        RowValues::Text(self.clone())
    }
}

impl ToRowValue for &str {
    fn to_row_value(&self) -> RowValues {
        RowValues::Text((*self).to_string())
    }
}

impl FromRowValue for NaiveDateTime {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        let converted = match value {
            RowValues::JSON(JsonValue::String(s)) => parse_timestamp(s),
            other => other.as_timestamp(),
        };
        converted.ok_or_else(|| ConversionError::new("NaiveDateTime", value))
    }
}

impl ToRowValue for NaiveDateTime {
    fn to_row_value(&self) -> RowValues {
        RowValues::Timestamp(*self)
    }
}

impl FromRowValue for NaiveDate {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        NaiveDateTime::from_row_value(value)
            .map(|dt| dt.date())
            .map_err(|_| ConversionError::new("NaiveDate", value))
    }
}

impl ToRowValue for NaiveDate {
    fn to_row_value(&self) -> RowValues {
        self.and_hms_opt(0, 0, 0)
            .map_or(RowValues::Null, RowValues::Timestamp)
    }
}

impl FromRowValue for JsonValue {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        Ok(match value {
            RowValues::JSON(v) => v.clone(),
            RowValues::Text(s) => {
                serde_json::from_str(s).unwrap_or_else(|_| JsonValue::String(s.clone()))
            }
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Bool(b) => JsonValue::Bool(*b),
            RowValues::Timestamp(dt) => JsonValue::String(dt.format(TIMESTAMP_FORMAT).to_string()),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
            RowValues::Null => JsonValue::Null,
        })
    }

    fn from_null() -> Option<Self> {
        Some(JsonValue::Null)
    }
}

impl ToRowValue for JsonValue {
    fn to_row_value(&self) -> RowValues {
        if self.is_null() {
            RowValues::Null
        } else {
            RowValues::JSON(self.clone())
        }
    }
}

impl FromRowValue for Vec<u8> {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        match value {
            RowValues::Blob(bytes) => Ok(bytes.clone()),
            RowValues::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(ConversionError::new("Vec<u8>", value)),
        }
    }
}

impl ToRowValue for Vec<u8> {
    fn to_row_value(&self) -> RowValues {
        RowValues::Blob(self.clone())
    }
}

impl FromRowValue for RowValues {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }

    fn from_null() -> Option<Self> {
        Some(RowValues::Null)
    }
}

impl ToRowValue for RowValues {
    fn to_row_value(&self) -> RowValues {
        self.clone()
    }
}

impl<T: FromRowValue> FromRowValue for Option<T> {
    fn from_row_value(value: &RowValues) -> Result<Self, ConversionError> {
        T::from_row_value(value).map(Some)
    }

    fn from_null() -> Option<Self> {
        Some(None)
    }
}

impl<T: ToRowValue> ToRowValue for Option<T> {
    fn to_row_value(&self) -> RowValues {
        self.as_ref().map_or(RowValues::Null, ToRowValue::to_row_value)
    }
}
