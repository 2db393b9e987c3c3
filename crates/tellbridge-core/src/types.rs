/*!
 * Core data types for tellbridge.
 *
 * Vendor identifiers arrive as either JSON strings or numbers depending on
 * the API mode, so [`Id`] normalises both to a string. [`Value`] is the
 * small value model carried by accessory characteristics.
 */
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A vendor device or sensor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Id(String);

impl Id {
    /// Create an ID from a string
    pub fn from_string<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_string())
    }

    /// Get the string representation of the ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => Id(s),
            Raw::Unsigned(n) => Id(n.to_string()),
            Raw::Signed(n) => Id(n.to_string()),
        })
    }
}

/// A characteristic value exchanged with the hosting runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
}

impl Value {
    /// Try to get a boolean value; integers are truthy when non-zero
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Try to get an integer value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(f.round() as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Try to get a float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u8> for Value {
    fn from(i: u8) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_string_or_number() {
        let id: Id = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");

        let id: Id = serde_json::from_str("42").unwrap();
        assert_eq!(id, Id::from("42"));

        let id: Id = serde_json::from_str("-3").unwrap();
        assert_eq!(id.as_str(), "-3");

        assert_eq!(Id::from(7u64).to_string(), "7");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(0).as_bool(), Some(false));
        assert_eq!(Value::Integer(1).as_bool(), Some(true));
        assert_eq!(Value::Float(49.6).as_integer(), Some(50));
        assert_eq!(Value::Float(f64::NAN).as_integer(), None);
        assert_eq!(Value::from(21u8).as_float(), Some(21.0));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::String("x".into()).as_bool(), None);
    }

    #[test]
    fn test_value_untagged_json() {
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_str("50").unwrap();
        assert_eq!(v, Value::Integer(50));
        let v: Value = serde_json::from_str("21.5").unwrap();
        assert_eq!(v, Value::Float(21.5));
        assert_eq!(serde_json::to_string(&Value::Float(21.5)).unwrap(), "21.5");
    }
}
