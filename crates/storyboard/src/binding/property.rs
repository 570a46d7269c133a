//! Component property tables.

use std::collections::BTreeMap;

/// Reference to an image asset: either a bundled asset name or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    /// Asset stored with the document, looked up by name in the asset store.
    Named(String),
    /// Remote asset.
    Url(String),
}

impl AssetRef {
    pub fn named(name: impl Into<String>) -> Self {
        AssetRef::Named(name.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        AssetRef::Url(url.into())
    }
}

/// A typed component property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Image(AssetRef),
}

impl PropertyValue {
    /// Wire name of the property kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "text",
            PropertyValue::Number(_) => "number",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Image(_) => "image",
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<AssetRef> for PropertyValue {
    fn from(value: AssetRef) -> Self {
        PropertyValue::Image(value)
    }
}

/// Name → value table read by property bindings.
///
/// Ordered by name so encoding is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    entries: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.entries.insert(name.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.entries.remove(name)
    }

    /// Keeps only the properties for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &PropertyValue) -> bool) {
        self.entries.retain(|name, value| keep(name, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `self` layered over `defaults`: entries here win.
    pub fn layered_over(&self, defaults: &Properties) -> Properties {
        let mut merged = defaults.clone();
        for (name, value) in &self.entries {
            merged.entries.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (name, value) in iter {
            properties.insert(name, value);
        }
        properties
    }
}
