use chrono::NaiveDateTime;

use crate::types::RowValues;

/// Hashable form of a key value.
///
/// NULL has no key form, so a NULL key never matches anything. Whole floats collapse
/// onto integers so `1` and `1.0` join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyValue {
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Json(String),
    Blob(Vec<u8>),
}

impl KeyValue {
    pub(crate) fn from_value(value: &RowValues) -> Option<Self> {
        Some(match value {
            RowValues::Null => return None,
            RowValues::Int(i) => KeyValue::Int(*i),
            RowValues::Float(f) => float_key(*f),
            RowValues::Text(s) => KeyValue::Text(s.clone()),
            RowValues::Bool(b) => KeyValue::Bool(*b),
            RowValues::Timestamp(dt) => KeyValue::Timestamp(*dt),
            RowValues::JSON(v) => KeyValue::Json(v.to_string()),
            RowValues::Blob(bytes) => KeyValue::Blob(bytes.clone()),
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_key(f: f64) -> KeyValue {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        KeyValue::Int(f as i64)
    } else {
        KeyValue::Float(f.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_has_no_key() {
        assert_eq!(KeyValue::from_value(&RowValues::Null), None);
    }

    #[test]
    fn whole_floats_match_integers() {
        assert_eq!(
            KeyValue::from_value(&RowValues::Float(3.0)),
            KeyValue::from_value(&RowValues::Int(3))
        );
        assert_ne!(
            KeyValue::from_value(&RowValues::Float(3.5)),
            KeyValue::from_value(&RowValues::Int(3))
        );
        assert_eq!(
            KeyValue::from_value(&RowValues::Float(-0.0)),
            KeyValue::from_value(&RowValues::Int(0))
        );
    }

    #[test]
    fn text_keys_are_case_sensitive() {
        assert_ne!(
            KeyValue::from_value(&RowValues::Text("a".into())),
            KeyValue::from_value(&RowValues::Text("A".into()))
        );
    }
}
