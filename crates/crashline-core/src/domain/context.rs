//! Sanitized context attached to reports
//!
//! A [`SanitizedContext`] is what remains of ambient request or environment
//! data after scrubbing and flattening. It is safe to serialize and send.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value written in place of every scrubbed field
pub const REDACTION_MARKER: &str = "------";

/// A single context value
///
/// Serialized untagged: a scalar is a JSON string, a sequence is a JSON
/// array of strings, a nested context is a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// A field that held exactly one value, or a fixed scalar
    Scalar(String),
    /// A field that held zero or several values, in original order
    Sequence(Vec<String>),
    /// A group of fields (e.g. the query parameters of a request)
    Nested(SanitizedContext),
}

impl ContextValue {
    /// The redaction marker as a value
    pub fn redacted() -> Self {
        ContextValue::Scalar(REDACTION_MARKER.to_string())
    }

    /// Returns the scalar text, if this is a scalar
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ContextValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the values, if this is a sequence
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            ContextValue::Sequence(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the nested context, if this is one
    pub fn as_nested(&self) -> Option<&SanitizedContext> {
        match self {
            ContextValue::Nested(c) => Some(c),
            _ => None,
        }
    }

    /// Returns true if this value is the redaction marker
    pub fn is_redacted(&self) -> bool {
        self.as_scalar() == Some(REDACTION_MARKER)
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Scalar(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(values: Vec<String>) -> Self {
        ContextValue::Sequence(values)
    }
}

impl From<SanitizedContext> for ContextValue {
    fn from(context: SanitizedContext) -> Self {
        ContextValue::Nested(context)
    }
}

/// Mapping from field name to sanitized value, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanitizedContext(BTreeMap<String, ContextValue>);

impl SanitizedContext {
    /// Creates an empty context
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a field, replacing any previous value under the same name
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up a field
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, ContextValue)> for SanitizedContext {
    fn from_iter<I: IntoIterator<Item = (String, ContextValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
