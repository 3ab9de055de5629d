use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::conversion::ToRowValue;
use crate::types::RowValues;

/// A named command parameter.
///
/// Names are stored with a leading `@`; backends translate to their own marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub name: String,
    pub value: RowValues,
}

impl SqlParam {
    #[must_use]
    pub fn new(name: impl AsRef<str>, value: impl ToRowValue) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            value: value.to_row_value(),
        }
    }

    #[must_use]
    pub fn int(name: impl AsRef<str>, value: i64) -> Self {
        Self::new(name, value)
    }

    #[must_use]
    pub fn text(name: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self::new(name, value.into())
    }

    #[must_use]
    pub fn float(name: impl AsRef<str>, value: f64) -> Self {
        Self::new(name, value)
    }

    #[must_use]
    pub fn bool(name: impl AsRef<str>, value: bool) -> Self {
        Self::new(name, value)
    }

    #[must_use]
    pub fn timestamp(name: impl AsRef<str>, value: NaiveDateTime) -> Self {
        Self::new(name, value)
    }

    #[must_use]
    pub fn blob(name: impl AsRef<str>, value: Vec<u8>) -> Self {
        Self::new(name, value)
    }

    #[must_use]
    pub fn null(name: impl AsRef<str>) -> Self {
        Self::new(name, RowValues::Null)
    }

    /// The name without its `@` marker.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches('@')
    }
}

/// Add the `@` marker when missing; `:` and `$` markers are replaced.
pub(crate) fn normalize_name(name: &str) -> String {
    let bare = name.trim().trim_start_matches(['@', ':', '$']);
    format!("@{bare}")
}

/// Build parameters from `(name, value)` pairs.
pub fn params_from_pairs<N, V, I>(pairs: I) -> Vec<SqlParam>
where
    N: AsRef<str>,
    V: ToRowValue,
    I: IntoIterator<Item = (N, V)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| SqlParam::new(name, value))
        .collect()
}

/// Build parameters from a name-to-value map, in key order.
#[must_use]
pub fn params_from_map(map: &BTreeMap<String, RowValues>) -> Vec<SqlParam> {
    map.iter()
        .map(|(name, value)| SqlParam::new(name, value.clone()))
        .collect()
}
