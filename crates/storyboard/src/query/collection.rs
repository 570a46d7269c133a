//! Collection projection: filter, sort, paginate.

use std::cmp::Ordering;

use serde_json::Value;

use crate::binding::{Properties, lookup, lookup_data};
use crate::query::condition::{Condition, all_hold};
use crate::query::scalar::Scalar;

/// One sort key. Paths are resolved against each item (see
/// [`keypath`](crate::binding::keypath)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key_path: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            ascending: true,
        }
    }

    pub fn descending(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            ascending: false,
        }
    }
}

/// Pagination window. `start_at` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub show: u32,
    pub start_at: u32,
}

impl Limit {
    pub fn new(show: u32, start_at: u32) -> Self {
        Self { show, start_at }
    }

    /// Returns the window of `items` this limit selects.
    ///
    /// The start index is clamped into range and the slice is clamped to
    /// `show`; a start past the end selects nothing.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let start = (self.start_at.saturating_sub(1) as usize).min(items.len());
        items.into_iter().skip(start).take(self.show as usize).collect()
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self {
            show: u32::MAX,
            start_at: 1,
        }
    }
}

/// A repeating element: one copy of its children per item of the array at
/// `key_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub key_path: String,
    pub filters: Vec<Condition>,
    pub sort_descriptors: Vec<SortDescriptor>,
    pub limit: Option<Limit>,
}

impl Collection {
    pub fn new(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            filters: Vec::new(),
            sort_descriptors: Vec::new(),
            limit: None,
        }
    }

    /// Projects the items shown by this collection.
    ///
    /// Anything other than an array at `key_path` yields no items.
    pub fn items(&self, data: Option<&Value>, properties: &Properties) -> Vec<Value> {
        let Some(Value::Array(source)) = lookup_data(&self.key_path, data) else {
            return Vec::new();
        };
        run_pipeline(
            source,
            &self.filters,
            &self.sort_descriptors,
            self.limit.as_ref(),
            properties,
        )
    }
}

/// Filters, sorts and paginates `source`, in that order.
pub fn run_pipeline(
    source: &[Value],
    filters: &[Condition],
    sort_descriptors: &[SortDescriptor],
    limit: Option<&Limit>,
    properties: &Properties,
) -> Vec<Value> {
    let mut items: Vec<&Value> = source
        .iter()
        .filter(|item| all_hold(filters, properties, Some(item)))
        .collect();

    if !sort_descriptors.is_empty() {
        // `sort_by` is stable: undecided pairs keep their input order.
        items.sort_by(|a, b| compare_items(a, b, sort_descriptors, properties));
    }

    let items = match limit {
        Some(limit) => limit.apply(items),
        None => items,
    };
    items.into_iter().cloned().collect()
}

fn compare_items(
    a: &Value,
    b: &Value,
    descriptors: &[SortDescriptor],
    properties: &Properties,
) -> Ordering {
    for descriptor in descriptors {
        let left = sort_key(a, &descriptor.key_path, properties);
        let right = sort_key(b, &descriptor.key_path, properties);

        // Same-kind values compare by value; otherwise by kind, missing first.
        let ordering = left.cmp(&right);

        if ordering != Ordering::Equal {
            return if descriptor.ascending {
                ordering
            } else {
                ordering.reverse()
            };
        }
    }
    Ordering::Equal
}

fn sort_key(item: &Value, key_path: &str, properties: &Properties) -> Option<Scalar> {
    lookup(key_path, properties, Some(item)).and_then(Scalar::from_found)
}
