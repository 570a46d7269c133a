//! `{{ key.path }}` templates over the property table and data context.

use serde_json::Value;

use crate::binding::keypath;
use crate::binding::property::Properties;
use crate::binding::variable::Bindable;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Expands every `{{ key.path }}` placeholder in `template`.
///
/// Placeholder contents are trimmed and looked up with the key-path rules of
/// [`keypath`]; the value is converted to text like a `String` binding.
/// Returns `None` if any placeholder cannot be resolved. An opening `{{`
/// with no closing `}}` is kept literally.
pub fn interpolate(template: &str, properties: &Properties, data: Option<&Value>) -> Option<String> {
    if !template.contains(OPEN) {
        return Some(template.to_string());
    }

    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        output.push_str(&rest[..start]);
        let path = after_open[..end].trim();
        let found = keypath::lookup(path, properties, data)?;
        output.push_str(&String::from_found(found)?);

        rest = &after_open[end + CLOSE.len()..];
    }

    output.push_str(rest);
    Some(output)
}
