use std::collections::HashMap;
use std::collections::hash_map;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlFacadeError;

/// Values that can be stored in a database row or used as query parameters.
///
/// ```rust
/// use sql_facade::prelude::*;
///
/// let params = named_params! {
///     "id" => 1,
///     "name" => "alice",
///     "nickname" => RowValues::Null,
/// };
/// assert_eq!(params.get("id"), Some(&RowValues::Int(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Render a non-null value as the plain text that gets quoted into an inline query.
    ///
    /// Returns `None` for `Null`, which is written as the bare `null` keyword instead.
    ///
    /// # Errors
    ///
    /// Returns `SqlFacadeError::ParameterError` for blobs, which have no string literal form.
    pub fn to_literal_text(&self) -> Result<Option<String>, SqlFacadeError> {
        let text = match self {
            RowValues::Null => return Ok(None),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Text(s) => s.clone(),
            RowValues::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            RowValues::Timestamp(dt) => dt.format("%F %T%.f").to_string(),
            RowValues::JSON(jval) => jval.to_string(),
            RowValues::Blob(_) => {
                return Err(SqlFacadeError::ParameterError(
                    "blob values cannot be inlined; use a prepared query".into(),
                ));
            }
        };
        Ok(Some(text))
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Named parameters for a statement, keyed by name without the leading `:`.
///
/// Entries the statement never references are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams(HashMap<String, RowValues>);

impl NamedParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RowValues>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, RowValues> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a NamedParams {
    type Item = (&'a String, &'a RowValues);
    type IntoIter = hash_map::Iter<'a, String, RowValues>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`NamedParams`] from `name => value` pairs.
#[macro_export]
macro_rules! named_params {
    () => {
        $crate::types::NamedParams::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::types::NamedParams::new()$(.with($name, $value))+
    };
}
