//! Version-gated upgrades of historical JSON shapes.
//!
//! Each type owns an ordered list of [`Migration`] steps. A document at
//! version `v` runs every step whose `since` is greater than `v`, oldest
//! first, so each step only ever sees the shape produced by the step before
//! it. The version number decides; the decoder never guesses a shape from
//! the keys present.

use serde_json::{Map, Value, json};

use crate::codec::primitives::{index_path, join};
use crate::error::DecodeError;
use crate::limits::COMPATIBILITY_VERSION_INTRODUCED;

/// A JSON object being upgraded in place.
pub type Object = Map<String, Value>;

/// One historical shape → next shape rewrite.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// First version written in the new shape.
    pub since: u32,
    pub describe: &'static str,
    pub apply: fn(&mut Object, &str) -> Result<(), DecodeError>,
}

/// Runs the steps of `steps` that apply to a document at `version`.
pub fn upgrade(
    object: &mut Object,
    version: u32,
    steps: &[Migration],
    path: &str,
) -> Result<(), DecodeError> {
    for step in steps.iter().filter(|step| version < step.since) {
        log::debug!("{path}: {} (v{} → v{})", step.describe, version, step.since);
        (step.apply)(object, path)?;
    }
    Ok(())
}

/// Steps shared by every node, run before the kind-specific ones.
pub const NODE: &[Migration] = &[Migration {
    since: 3,
    describe: "flattened padding edges → padding object",
    apply: nest_padding,
}];

pub const META: &[Migration] = &[Migration {
    since: COMPATIBILITY_VERSION_INTRODUCED,
    describe: "compatibilityVersion defaults to version",
    apply: default_compatibility_version,
}];

pub const COMPONENT_INSTANCE: &[Migration] = &[Migration {
    since: 5,
    describe: "mainComponentID → componentID",
    apply: rename_main_component_id,
}];

pub const TEXT: &[Migration] = &[
    Migration {
        since: 6,
        describe: "numberOfLines → lineLimit",
        apply: number_of_lines_to_line_limit,
    },
    Migration {
        since: 8,
        describe: "bare text → text variable",
        apply: text_to_variable,
    },
];

pub const IMAGE: &[Migration] = &[Migration {
    since: 8,
    describe: "imageName/url → source variable",
    apply: image_to_source,
}];

pub const COLLECTION: &[Migration] = &[
    Migration {
        since: 7,
        describe: "dataKey → keyPath",
        apply: data_key_to_key_path,
    },
    Migration {
        since: 9,
        describe: "bare filter values → typed values",
        apply: type_filter_values,
    },
    Migration {
        since: 10,
        describe: "limit {count, offset} → {show, startAt}",
        apply: limit_to_one_based,
    },
];

pub const CONDITIONAL: &[Migration] = &[Migration {
    since: 9,
    describe: "bare condition values → typed values",
    apply: type_condition_values,
}];

/// Kind-specific steps for the node type `type_name`.
pub fn steps_for(type_name: &str) -> &'static [Migration] {
    match type_name {
        "ComponentInstance" => COMPONENT_INSTANCE,
        "Text" => TEXT,
        "Image" => IMAGE,
        "Collection" => COLLECTION,
        "Conditional" => CONDITIONAL,
        _ => &[],
    }
}

const PADDING_EDGES: [(&str, &str); 4] = [
    ("paddingTop", "top"),
    ("paddingLeading", "leading"),
    ("paddingBottom", "bottom"),
    ("paddingTrailing", "trailing"),
];

fn nest_padding(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    let mut padding = Object::new();
    for (legacy, edge) in PADDING_EDGES {
        let Some(value) = object.remove(legacy) else {
            continue;
        };
        if !value.is_number() && !value.is_null() {
            return Err(DecodeError::invalid(join(path, legacy), "number"));
        }
        padding.insert(edge.to_string(), value);
    }
    if !padding.is_empty() {
        for (_, edge) in PADDING_EDGES {
            padding.entry(edge).or_insert(json!(0));
        }
        object.insert("padding".to_string(), Value::Object(padding));
    }
    Ok(())
}

fn default_compatibility_version(object: &mut Object, _path: &str) -> Result<(), DecodeError> {
    if !object.contains_key("compatibilityVersion") {
        let version = object.get("version").cloned().unwrap_or(Value::Null);
        object.insert("compatibilityVersion".to_string(), version);
    }
    Ok(())
}

fn rename_main_component_id(object: &mut Object, _path: &str) -> Result<(), DecodeError> {
    if let Some(legacy) = object.remove("mainComponentID") {
        object.entry("componentID").or_insert(legacy);
    }
    Ok(())
}

fn number_of_lines_to_line_limit(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    let Some(lines) = object.remove("numberOfLines") else {
        return Ok(());
    };
    let lines = match &lines {
        Value::Null => 0,
        other => other
            .as_u64()
            .ok_or_else(|| DecodeError::invalid(join(path, "numberOfLines"), "non-negative integer"))?,
    };
    if lines > 0 {
        object.insert("lineLimit".to_string(), json!({"min": null, "max": lines}));
    }
    Ok(())
}

fn text_to_variable(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    let text = match object.remove("text") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(_) => return Err(DecodeError::invalid(join(path, "text"), "string")),
    };
    object.insert("text".to_string(), json!({"constant": text}));
    Ok(())
}

fn image_to_source(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    let name = object.remove("imageName");
    let url = object.remove("url");
    let asset = match (name, url) {
        (Some(Value::String(name)), _) => json!({"name": name}),
        (Some(Value::Null) | None, Some(Value::String(url))) => json!({"url": url}),
        (Some(Value::Null) | None, Some(Value::Null) | None) => {
            return Err(DecodeError::missing(join(path, "imageName")));
        }
        (Some(_), _) => return Err(DecodeError::invalid(join(path, "imageName"), "string")),
        (_, Some(_)) => return Err(DecodeError::invalid(join(path, "url"), "string")),
    };
    object.insert("source".to_string(), json!({"constant": asset}));
    Ok(())
}

fn data_key_to_key_path(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    let key_path = match object.remove("dataKey") {
        None | Some(Value::Null) => "data".to_string(),
        Some(Value::String(key)) if key.is_empty() => "data".to_string(),
        Some(Value::String(key)) => format!("data.{key}"),
        Some(_) => return Err(DecodeError::invalid(join(path, "dataKey"), "string")),
    };
    object.insert("keyPath".to_string(), Value::String(key_path));
    Ok(())
}

fn type_filter_values(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    type_values_in(object, "filters", path)
}

fn type_condition_values(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    type_values_in(object, "conditions", path)
}

fn type_values_in(object: &mut Object, key: &str, path: &str) -> Result<(), DecodeError> {
    let Some(Value::Array(conditions)) = object.get_mut(key) else {
        return Ok(());
    };
    for (i, condition) in conditions.iter_mut().enumerate() {
        let Some(condition) = condition.as_object_mut() else {
            continue;
        };
        let Some(value) = condition.remove("value") else {
            continue;
        };
        let typed = match value {
            Value::Null => json!({"type": "null", "value": null}),
            Value::Bool(b) => json!({"type": "boolean", "value": b}),
            Value::Number(n) => json!({"type": "number", "value": n}),
            Value::String(s) => json!({"type": "text", "value": s}),
            Value::Array(_) | Value::Object(_) => {
                let at = join(&index_path(&join(path, key), i), "value");
                return Err(DecodeError::invalid(at, "scalar"));
            }
        };
        condition.insert("value".to_string(), typed);
    }
    Ok(())
}

fn limit_to_one_based(object: &mut Object, path: &str) -> Result<(), DecodeError> {
    let Some(limit) = object.remove("limit") else {
        return Ok(());
    };
    if limit.is_null() {
        return Ok(());
    }
    let limit_path = join(path, "limit");
    let fields = limit
        .as_object()
        .ok_or_else(|| DecodeError::invalid(limit_path.as_str(), "object"))?;

    let count = fields
        .get("count")
        .ok_or_else(|| DecodeError::missing(join(&limit_path, "count")))?
        .as_u64()
        .ok_or_else(|| DecodeError::invalid(join(&limit_path, "count"), "non-negative integer"))?;
    let offset = match fields.get("offset") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| DecodeError::invalid(join(&limit_path, "offset"), "non-negative integer"))?,
    };

    object.insert(
        "limit".to_string(),
        json!({"show": count, "startAt": offset.saturating_add(1)}),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgraded(value: Value, version: u32, steps: &[Migration]) -> Result<Value, DecodeError> {
        let Value::Object(mut object) = value else {
            panic!("fixture must be an object");
        };
        upgrade(&mut object, version, steps, "N")?;
        Ok(Value::Object(object))
    }

    #[test]
    fn test_padding_nested_with_defaults() {
        let out = upgraded(json!({"paddingTop": 4, "paddingTrailing": 2}), 2, NODE).unwrap();
        assert_eq!(
            out,
            json!({"padding": {"top": 4, "leading": 0, "bottom": 0, "trailing": 2}})
        );
        assert_eq!(upgraded(json!({}), 2, NODE).unwrap(), json!({}));
    }

    #[test]
    fn test_current_version_skips_steps() {
        let legacy = json!({"paddingTop": 4});
        assert_eq!(upgraded(legacy.clone(), 3, NODE).unwrap(), legacy);
    }

    #[test]
    fn test_number_of_lines() {
        assert_eq!(
            upgraded(json!({"numberOfLines": 3, "text": "hi"}), 5, TEXT).unwrap(),
            json!({"lineLimit": {"min": null, "max": 3}, "text": {"constant": "hi"}})
        );
        assert_eq!(
            upgraded(json!({"numberOfLines": 0}), 5, TEXT).unwrap(),
            json!({"text": {"constant": ""}})
        );
        assert_eq!(
            upgraded(json!({"numberOfLines": "x"}), 5, TEXT),
            Err(DecodeError::invalid("N.numberOfLines", "non-negative integer"))
        );
    }

    #[test]
    fn test_text_only_wrapped_before_eight() {
        assert_eq!(
            upgraded(json!({"text": "hi", "lineLimit": {"max": 2}}), 7, TEXT).unwrap(),
            json!({"text": {"constant": "hi"}, "lineLimit": {"max": 2}})
        );
    }

    #[test]
    fn test_main_component_rename() {
        assert_eq!(
            upgraded(json!({"mainComponentID": "M"}), 4, COMPONENT_INSTANCE).unwrap(),
            json!({"componentID": "M"})
        );
        assert_eq!(
            upgraded(json!({"mainComponentID": "M", "componentID": "C"}), 4, COMPONENT_INSTANCE)
                .unwrap(),
            json!({"componentID": "C"})
        );
    }

    #[test]
    fn test_image_source() {
        assert_eq!(
            upgraded(json!({"imageName": "logo"}), 7, IMAGE).unwrap(),
            json!({"source": {"constant": {"name": "logo"}}})
        );
        assert_eq!(
            upgraded(json!({"url": "https://x/y.png"}), 7, IMAGE).unwrap(),
            json!({"source": {"constant": {"url": "https://x/y.png"}}})
        );
        assert_eq!(
            upgraded(json!({}), 7, IMAGE),
            Err(DecodeError::missing("N.imageName"))
        );
    }

    #[test]
    fn test_collection_history() {
        let v6 = json!({
            "dataKey": "items",
            "filters": [{"keyPath": "n", "predicate": "equals", "value": 3}],
            "limit": {"count": 5, "offset": 2}
        });
        assert_eq!(
            upgraded(v6, 6, COLLECTION).unwrap(),
            json!({
                "keyPath": "data.items",
                "filters": [{"keyPath": "n", "predicate": "equals", "value": {"type": "number", "value": 3}}],
                "limit": {"show": 5, "startAt": 3}
            })
        );

        assert_eq!(
            upgraded(json!({"limit": {"count": 1}}), 9, COLLECTION).unwrap(),
            json!({"limit": {"show": 1, "startAt": 1}})
        );
        assert_eq!(
            upgraded(json!({}), 6, COLLECTION).unwrap(),
            json!({"keyPath": "data"})
        );
    }

    #[test]
    fn test_structured_condition_value_rejected() {
        assert_eq!(
            upgraded(json!({"conditions": [{"value": [1]}]}), 8, CONDITIONAL),
            Err(DecodeError::invalid("N.conditions[0].value", "scalar"))
        );
    }

    #[test]
    fn test_meta_compatibility_default() {
        assert_eq!(
            upgraded(json!({"version": 2}), 2, META).unwrap(),
            json!({"version": 2, "compatibilityVersion": 2})
        );
        let current = json!({"version": COMPATIBILITY_VERSION_INTRODUCED});
        assert_eq!(
            upgraded(current.clone(), COMPATIBILITY_VERSION_INTRODUCED, META).unwrap(),
            current
        );
    }
}
