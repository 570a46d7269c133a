//! Key-path lookup into the property table and the data context.
//!
//! A key-path is a dot-separated list of map keys. The first segment picks
//! the root:
//!
//! - `properties.<name>` reads the property table;
//! - `data.<a>.<b>` walks the supplied data object;
//! - any other first segment is walked relative to the data object, so
//!   `"n"` and `"data.n"` are the same lookup.
//!
//! No array indexing or wildcards.

use serde_json::Value;

use crate::binding::property::{Properties, PropertyValue};

/// Root segment selecting the data context.
pub const DATA_ROOT: &str = "data";

/// Root segment selecting the property table.
pub const PROPERTIES_ROOT: &str = "properties";

/// A value located by a key-path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Found<'a> {
    Data(&'a Value),
    Property(&'a PropertyValue),
}

impl Found<'_> {
    /// Returns true for an explicit JSON `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Found::Data(Value::Null))
    }
}

/// Resolves a key-path. `None` means the path does not exist.
pub fn lookup<'a>(
    key_path: &str,
    properties: &'a Properties,
    data: Option<&'a Value>,
) -> Option<Found<'a>> {
    let mut segments = key_path.split('.');
    let first = segments.next()?;

    match first {
        PROPERTIES_ROOT => {
            let name = segments.next()?;
            if segments.next().is_some() {
                return None;
            }
            properties.get(name).map(Found::Property)
        }
        DATA_ROOT => walk(data?, segments).map(Found::Data),
        "" => None,
        _ => walk(data?, std::iter::once(first).chain(segments)).map(Found::Data),
    }
}

/// Resolves a key-path that must address the data context.
pub fn lookup_data<'a>(key_path: &str, data: Option<&'a Value>) -> Option<&'a Value> {
    let mut segments = key_path.split('.');
    match segments.next()? {
        DATA_ROOT => walk(data?, segments),
        "" | PROPERTIES_ROOT => None,
        first => walk(data?, std::iter::once(first).chain(segments)),
    }
}

fn walk<'a, 'p>(root: &'a Value, segments: impl Iterator<Item = &'p str>) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_data_root() {
        let data = json!({"user": {"name": "Ada"}});
        let props = Properties::new();
        let found = lookup("data.user.name", &props, Some(&data));
        assert_eq!(found, Some(Found::Data(&json!("Ada"))));
    }

    #[test]
    fn test_bare_data_root_returns_whole_object() {
        let data = json!({"a": 1});
        assert_eq!(lookup_data("data", Some(&data)), Some(&data));
    }

    #[test]
    fn test_relative_path() {
        let data = json!({"n": 3});
        let props = Properties::new();
        assert_eq!(lookup("n", &props, Some(&data)), Some(Found::Data(&json!(3))));
    }

    #[test]
    fn test_properties_root() {
        let props = Properties::new().with("title", "Hi");
        let found = lookup("properties.title", &props, None);
        assert_eq!(found, Some(Found::Property(&PropertyValue::Text("Hi".into()))));
        assert_eq!(lookup("properties.missing", &props, None), None);
        assert_eq!(lookup("properties.title.deeper", &props, None), None);
    }

    #[test]
    fn test_no_array_indexing() {
        let data = json!({"items": [1, 2, 3]});
        assert_eq!(lookup_data("data.items.0", Some(&data)), None);
    }

    #[test]
    fn test_missing_data_context() {
        let props = Properties::new();
        assert_eq!(lookup("data.a", &props, None), None);
    }

    #[test]
    fn test_explicit_null_is_found() {
        let data = json!({"a": null});
        let props = Properties::new();
        let found = lookup("data.a", &props, Some(&data)).unwrap();
        assert!(found.is_null());
    }
}
