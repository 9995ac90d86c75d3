//! Stored Value Types
//!
//! A key holds exactly one of three value shapes. The shape is fixed until the
//! next put call at that key, which may switch it to another shape.
//!
//! ```text
//! Value::Scalar("hello")
//! Value::List(["a", "b", "c"])
//! Value::Dictionary({"field": "value"})
//! ```

use std::collections::HashMap;
use std::fmt;

/// The payload of a dictionary value.
pub type Dictionary = HashMap<String, String>;

/// A value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A single text value
    Scalar(String),
    /// An ordered sequence of text values
    List(Vec<String>),
    /// A mapping of unique text keys to text values
    Dictionary(Dictionary),
}

impl Value {
    /// Returns which variant this value holds.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Scalar(_) => ValueType::Scalar,
            Value::List(_) => ValueType::List,
            Value::Dictionary(_) => ValueType::Dictionary,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(list) => Some(list.as_slice()),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Self {
        Value::List(list)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dictionary(dict)
    }
}

/// The shape of a stored value.
///
/// The request layer uses this to decide how to format a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar,
    List,
    Dictionary,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Scalar => "scalar",
            ValueType::List => "list",
            ValueType::Dictionary => "dictionary",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion between a typed payload and [`Value`].
///
/// Implemented for the payload of each variant so the put and get paths can
/// be written once and dispatched per shape.
pub trait Shape: Sized {
    const TYPE: ValueType;

    fn into_value(self) -> Value;

    /// Unwraps the payload if `value` holds this shape, handing it back otherwise.
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl Shape for String {
    const TYPE: ValueType = ValueType::Scalar;

    fn into_value(self) -> Value {
        Value::Scalar(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Scalar(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl Shape for Vec<String> {
    const TYPE: ValueType = ValueType::List;

    fn into_value(self) -> Value {
        Value::List(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::List(list) => Ok(list),
            other => Err(other),
        }
    }
}

impl Shape for Dictionary {
    const TYPE: ValueType = ValueType::Dictionary;

    fn into_value(self) -> Value {
        Value::Dictionary(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Dictionary(dict) => Ok(dict),
            other => Err(other),
        }
    }
}

/// What a put call found at the key before overwriting it.
///
/// A put always succeeds. The previous value is surfaced only when it had the
/// same shape as the new one; a shape change reports just the old shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome<T> {
    /// The key was absent (or already expired)
    Inserted,
    /// The key held a value of the same shape, returned here
    Updated(T),
    /// The key held a value of a different shape
    Replaced(ValueType),
}

impl<T: Shape> PutOutcome<T> {
    pub(crate) fn from_previous(previous: Option<Value>) -> Self {
        match previous {
            None => PutOutcome::Inserted,
            Some(value) => match T::from_value(value) {
                Ok(prev) => PutOutcome::Updated(prev),
                Err(other) => PutOutcome::Replaced(other.value_type()),
            },
        }
    }
}

impl<T> PutOutcome<T> {
    /// True only when a value of the same shape was overwritten.
    pub fn is_updated(&self) -> bool {
        matches!(self, PutOutcome::Updated(_))
    }

    pub fn previous(&self) -> Option<&T> {
        match self {
            PutOutcome::Updated(prev) => Some(prev),
            _ => None,
        }
    }

    /// Splits the outcome into the previous value and the overwrite flag.
    pub fn into_parts(self) -> (Option<T>, bool) {
        match self {
            PutOutcome::Updated(prev) => (Some(prev), true),
            _ => (None, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type() {
        assert_eq!(Value::from("a").value_type(), ValueType::Scalar);
        assert_eq!(
            Value::from(vec!["a".to_string()]).value_type(),
            ValueType::List
        );
        assert_eq!(
            Value::from(Dictionary::new()).value_type(),
            ValueType::Dictionary
        );
        assert_eq!(ValueType::Dictionary.to_string(), "dictionary");
    }

    #[test]
    fn test_accessors() {
        let value = Value::from("hello");
        assert_eq!(value.as_scalar(), Some("hello"));
        assert_eq!(value.as_list(), None);
        assert_eq!(value.as_dictionary(), None);
    }

    #[test]
    fn test_outcome_from_previous() {
        let outcome = PutOutcome::<String>::from_previous(None);
        assert_eq!(outcome.clone().into_parts(), (None, false));

        let outcome = PutOutcome::<String>::from_previous(Some(Value::from("old")));
        assert!(outcome.is_updated());
        assert_eq!(outcome.previous().map(String::as_str), Some("old"));

        let outcome =
            PutOutcome::<String>::from_previous(Some(Value::List(vec!["x".to_string()])));
        assert_eq!(outcome, PutOutcome::Replaced(ValueType::List));
        assert_eq!(outcome.into_parts(), (None, false));
    }
}
