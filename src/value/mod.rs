//! # Value Type System
//!
//! Application data held by a record is untyped: a field may carry an
//! integer, a float, text, a timestamp, or something that cannot be written
//! at all (a list). Columns decide later, during validation, which of these
//! they accept.
//!
//! ## Usage
//!
//! ```rust
//! use rowrecord::Value;
//!
//! let id = Value::from(36);
//! let city = Value::from("Washington DC");
//! assert_eq!(id.to_string(), "36");
//! assert!(city.is_stringable());
//! ```

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// An ordered column → value map. Used for record fields and result rows.
pub type Row = IndexMap<String, Value>;

/// Format used when a timestamp is rendered as text or bound as a parameter.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static NUMERIC_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").expect("numeric text regex")
});

/// A dynamically-typed field value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL / absent value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Calendar timestamp without a zone
    DateTime(NaiveDateTime),
    /// Sequence value; never writable to a column
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text of a `String` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the value has a meaningful string form. Lists do not.
    pub fn is_stringable(&self) -> bool {
        !matches!(self, Value::List(_))
    }

    /// Integers, finite floats, and numeric text (optional sign, fraction and
    /// exponent). Exponent text must stay within `f64` range.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Int(_) => true,
            Value::Float(f) => f.is_finite(),
            Value::String(s) => plain_decimal(s).is_some(),
            _ => false,
        }
    }

    /// Plain decimal text for a numeric value, without exponent.
    ///
    /// Floats use their shortest round-trip representation, so `6000.256`
    /// yields `"6000.256"` rather than the full binary expansion.
    pub fn decimal_text(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) if f.is_finite() => Some(f.to_string()),
            Value::String(s) => plain_decimal(s),
            _ => None,
        }
    }

    /// Short type label used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => write!(f, "1"),
            Value::Bool(false) => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
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

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Numeric text without sign prefix or exponent; `None` when the text is not
/// a number or its exponent overflows `f64`
fn plain_decimal(text: &str) -> Option<String> {
    if !NUMERIC_TEXT.is_match(text) {
        return None;
    }
    let trimmed = text.trim();
    if trimmed.contains(['e', 'E']) {
        return trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.to_string());
    }
    Some(trimmed.trim_start_matches('+').to_string())
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            // Nested objects have no column representation; keep their JSON text
            obj @ serde_json::Value::Object(_) => Value::String(obj.to_string()),
        }
    }
}
