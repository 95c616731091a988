//! Row payloads.
//!
//! A row is a flat JSON object whose values are strings. Callers hand rows
//! over as serialized text; numbers and booleans are accepted and kept in
//! their textual form, anything nested is refused.
//!
//! The canonical form (keys in byte order, compact JSON) is the only form
//! that is ever stored, size-checked or hashed.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

/// A table row: column name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, String>);

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a serialized JSON object into a row.
    ///
    /// ```
    /// use chaindb_codec::Row;
    ///
    /// let row = Row::parse(r#"{"id": 7, "paid": true, "memo": "x"}"#).unwrap();
    /// assert_eq!(row.get("id"), Some("7"));
    /// assert_eq!(row.get("paid"), Some("true"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidJson`] for malformed text,
    /// [`CodecError::NotAnObject`] if the top level is not an object and
    /// [`CodecError::UnsupportedValue`] for `null`, arrays and objects.
    pub fn parse(text: &str) -> CodecResult<Self> {
        let json: Json = serde_json::from_str(text).map_err(|e| CodecError::InvalidJson {
            message: e.to_string(),
        })?;
        Self::from_json(json)
    }

    fn from_json(json: Json) -> CodecResult<Self> {
        let object = match json {
            Json::Object(object) => object,
            other => {
                return Err(CodecError::NotAnObject {
                    kind: json_kind(&other),
                })
            }
        };

        let mut columns = BTreeMap::new();
        for (column, value) in object {
            let text = match value {
                Json::String(s) => s,
                Json::Number(n) => n.to_string(),
                Json::Bool(b) => b.to_string(),
                other => {
                    return Err(CodecError::UnsupportedValue {
                        column,
                        kind: json_kind(&other),
                    })
                }
            };
            columns.insert(column, text);
        }
        Ok(Self(columns))
    }

    /// Returns the canonical JSON text of this row.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if serialization fails.
    pub fn to_canonical_string(&self) -> CodecResult<String> {
        serde_json::to_string(&self.0).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    /// Returns the value of `column`, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Sets `column` to `value`, returning the previous value.
    pub fn insert(
        &mut self,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(column.into(), value.into())
    }

    /// Iterates over column names in canonical order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(column, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of columns set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Row {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_canonical_string() {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
