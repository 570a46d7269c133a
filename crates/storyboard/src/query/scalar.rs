//! Closed scalar union for comparison values and resolved data.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::binding::{Found, PropertyValue, format_number};
use crate::util::Timestamp;

/// A scalar value: the comparison value of a condition, or a resolved
/// leaf of the data context.
///
/// Equality, hashing and ordering are total. Numbers compare with
/// `f64::total_cmp` after folding `-0.0` into `0.0`; values of different
/// kinds order by kind (`Null < Boolean < Number < Text < Date`).
#[derive(Debug, Clone)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(Timestamp),
    Null,
}

impl Scalar {
    /// Wire name of the scalar kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Text(_) => "text",
            Scalar::Number(_) => "number",
            Scalar::Boolean(_) => "boolean",
            Scalar::Date(_) => "date",
            Scalar::Null => "null",
        }
    }

    /// Converts a JSON leaf. Arrays and objects are not scalars.
    pub fn from_data(value: &Value) -> Option<Scalar> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Boolean(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Converts a property value. Images are not scalars.
    pub fn from_property(value: &PropertyValue) -> Option<Scalar> {
        match value {
            PropertyValue::Text(s) => Some(Scalar::Text(s.clone())),
            PropertyValue::Number(n) => Some(Scalar::Number(*n)),
            PropertyValue::Boolean(b) => Some(Scalar::Boolean(*b)),
            PropertyValue::Image(_) => None,
        }
    }

    pub fn from_found(found: Found<'_>) -> Option<Scalar> {
        match found {
            Found::Data(value) => Scalar::from_data(value),
            Found::Property(value) => Scalar::from_property(value),
        }
    }

    /// Text form used for text comparisons.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Number(n) => Some(format_number(*n)),
            Scalar::Boolean(b) => Some(b.to_string()),
            Scalar::Date(ts) => Some(ts.to_rfc3339()),
            Scalar::Null => None,
        }
    }

    /// Numeric form; text is parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean form; nonzero numbers are true, text must spell a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            Scalar::Number(n) => Some(*n != 0.0),
            Scalar::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Date form; text is parsed as RFC 3339, numbers are epoch seconds.
    pub fn as_date(&self) -> Option<Timestamp> {
        match self {
            Scalar::Date(ts) => Some(*ts),
            Scalar::Text(s) => Timestamp::parse(s).ok(),
            Scalar::Number(n) => Timestamp::from_epoch_seconds(*n),
            _ => None,
        }
    }

    /// Orders two scalars of the same kind. Different kinds, and nulls,
    /// do not compare.
    pub fn compare_same_kind(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Number(a), Scalar::Number(b)) => Some(normalize(*a).total_cmp(&normalize(*b))),
            (Scalar::Boolean(a), Scalar::Boolean(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Boolean(_) => 1,
            Scalar::Number(_) => 2,
            Scalar::Text(_) => 3,
            Scalar::Date(_) => 4,
        }
    }
}

fn normalize(n: f64) -> f64 {
    if n == 0.0 { 0.0 } else { n }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Ordering::Equal,
            _ => self
                .compare_same_kind(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }
}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Scalar::Text(s) => s.hash(state),
            Scalar::Number(n) => normalize(*n).to_bits().hash(state),
            Scalar::Boolean(b) => b.hash(state),
            Scalar::Date(ts) => ts.hash(state),
            Scalar::Null => {}
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<Timestamp> for Scalar {
    fn from(value: Timestamp) -> Self {
        Scalar::Date(value)
    }
}
