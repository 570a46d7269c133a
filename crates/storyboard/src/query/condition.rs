//! Conditions: a key-path, a predicate and an optional comparison value.

use std::cmp::Ordering;

use serde_json::Value;

use crate::binding::{Found, Properties, interpolate, lookup};
use crate::query::scalar::Scalar;

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Equals,
    DoesNotEqual,
    IsGreaterThan,
    IsLessThan,
    IsSet,
    IsNotSet,
    IsTrue,
    IsFalse,
}

impl Predicate {
    pub const ALL: [Predicate; 8] = [
        Predicate::Equals,
        Predicate::DoesNotEqual,
        Predicate::IsGreaterThan,
        Predicate::IsLessThan,
        Predicate::IsSet,
        Predicate::IsNotSet,
        Predicate::IsTrue,
        Predicate::IsFalse,
    ];

    /// Name used in the document format.
    pub fn wire_name(self) -> &'static str {
        match self {
            Predicate::Equals => "equals",
            Predicate::DoesNotEqual => "doesNotEqual",
            Predicate::IsGreaterThan => "isGreaterThan",
            Predicate::IsLessThan => "isLessThan",
            Predicate::IsSet => "isSet",
            Predicate::IsNotSet => "isNotSet",
            Predicate::IsTrue => "isTrue",
            Predicate::IsFalse => "isFalse",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Predicate> {
        Predicate::ALL.into_iter().find(|p| p.wire_name() == name)
    }

    /// Whether the predicate reads the comparison value.
    pub fn takes_value(self) -> bool {
        matches!(
            self,
            Predicate::Equals
                | Predicate::DoesNotEqual
                | Predicate::IsGreaterThan
                | Predicate::IsLessThan
        )
    }
}

/// A predicate over the value at `key_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key_path: String,
    pub predicate: Predicate,
    pub value: Option<Scalar>,
}

impl Condition {
    pub fn new(key_path: impl Into<String>, predicate: Predicate, value: Option<Scalar>) -> Self {
        Self {
            key_path: key_path.into(),
            predicate,
            value,
        }
    }

    /// Evaluates the condition.
    ///
    /// A left-hand value that cannot be coerced to the comparison value's
    /// kind never matches: `equals` and the ordering predicates are false,
    /// `doesNotEqual` is true.
    pub fn evaluate(&self, properties: &Properties, data: Option<&Value>) -> bool {
        let found = lookup(&self.key_path, properties, data);

        match self.predicate {
            Predicate::IsSet => found.is_some_and(|f| !f.is_null()),
            Predicate::IsNotSet => found.is_none_or(|f| f.is_null()),
            Predicate::IsTrue => left_scalar(found).and_then(|s| s.as_bool()) == Some(true),
            Predicate::IsFalse => left_scalar(found).and_then(|s| s.as_bool()) == Some(false),
            Predicate::Equals => self.compare(found, properties, data) == Some(Ordering::Equal),
            Predicate::DoesNotEqual => {
                self.compare(found, properties, data) != Some(Ordering::Equal)
            }
            Predicate::IsGreaterThan => {
                self.compare(found, properties, data) == Some(Ordering::Greater)
            }
            Predicate::IsLessThan => self.compare(found, properties, data) == Some(Ordering::Less),
        }
    }

    /// Orders the left-hand value against the comparison value, coercing
    /// the left side to the comparison value's kind.
    fn compare(
        &self,
        found: Option<Found<'_>>,
        properties: &Properties,
        data: Option<&Value>,
    ) -> Option<Ordering> {
        let left = left_scalar(found);

        match self.value.as_ref()? {
            Scalar::Text(template) => {
                let expected = interpolate(template, properties, data)
                    .unwrap_or_else(|| template.clone());
                Some(left?.as_text()?.as_str().cmp(expected.as_str()))
            }
            Scalar::Number(expected) => left?.as_number()?.partial_cmp(expected),
            Scalar::Boolean(expected) => Some(left?.as_bool()?.cmp(expected)),
            Scalar::Date(expected) => Some(left?.as_date()?.cmp(expected)),
            Scalar::Null => match left {
                None | Some(Scalar::Null) => Some(Ordering::Equal),
                Some(_) => None,
            },
        }
    }
}

fn left_scalar(found: Option<Found<'_>>) -> Option<Scalar> {
    found.and_then(Scalar::from_found)
}

/// Content gate: shows its children only while every condition holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conditional {
    pub conditions: Vec<Condition>,
}

impl Conditional {
    /// True when all conditions hold. No conditions means always shown.
    pub fn is_satisfied(&self, data: Option<&Value>, properties: &Properties) -> bool {
        all_hold(&self.conditions, properties, data)
    }
}

pub(crate) fn all_hold(conditions: &[Condition], properties: &Properties, data: Option<&Value>) -> bool {
    conditions.iter().all(|c| c.evaluate(properties, data))
}
