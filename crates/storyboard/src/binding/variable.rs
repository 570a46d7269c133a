//! Literal-or-bound value slots.
//!
//! A [`Variable`] always carries a constant. When it also carries a
//! [`Binding`], evaluation looks the value up in one of three contexts (the
//! component property table, the data object, or the fetched asset) and
//! coerces it to the slot's type through [`Bindable`].

use serde_json::Value;

use crate::binding::keypath::{self, Found};
use crate::binding::property::{AssetRef, Properties, PropertyValue};

/// Where a bound value is read from. Carries no value of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    /// A named component property.
    Property(String),
    /// A key-path into the data context (or the property table, see
    /// [`keypath`]).
    KeyPath(String),
    /// The asset fetched by the host for the current element.
    FetchedAsset,
}

/// Types a binding can resolve to, and the coercions each accepts.
pub trait Bindable: Clone {
    /// Converts a property table value.
    fn from_property(value: &PropertyValue) -> Option<Self>;

    /// Converts a value found in the data context.
    fn from_data(value: &Value) -> Option<Self>;

    /// Converts the fetched asset. Only asset slots accept it.
    fn from_asset(_asset: &AssetRef) -> Option<Self> {
        None
    }

    /// Converts whatever a key-path lookup produced.
    fn from_found(found: Found<'_>) -> Option<Self> {
        match found {
            Found::Data(value) => Self::from_data(value),
            Found::Property(value) => Self::from_property(value),
        }
    }
}

/// Formats a number the way it is shown in text: whole numbers without a
/// fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl Bindable for String {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Text(text) => Some(text.clone()),
            PropertyValue::Number(n) => Some(format_number(*n)),
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::Image(_) => None,
        }
    }

    fn from_data(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(n) => n.as_f64().map(format_number),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Bindable for f64 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn from_data(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Bindable for bool {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Boolean(b) => Some(*b),
            PropertyValue::Number(n) => Some(*n != 0.0),
            PropertyValue::Text(text) => parse_bool(text),
            PropertyValue::Image(_) => None,
        }
    }

    fn from_data(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            Value::String(text) => parse_bool(text),
            _ => None,
        }
    }
}

impl Bindable for AssetRef {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Image(asset) => Some(asset.clone()),
            PropertyValue::Text(url) => Some(AssetRef::Url(url.clone())),
            _ => None,
        }
    }

    fn from_data(value: &Value) -> Option<Self> {
        value.as_str().map(|url| AssetRef::Url(url.to_string()))
    }

    fn from_asset(asset: &AssetRef) -> Option<Self> {
        Some(asset.clone())
    }
}

/// A value slot holding a constant and an optional binding.
///
/// The constant and the binding are independent: changing one never
/// changes the other. [`update_constant`](Self::update_constant) is the only
/// operation that copies a resolved value into the constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable<T> {
    pub constant: T,
    pub binding: Option<Binding>,
}

impl<T> Variable<T> {
    /// Creates an unbound variable.
    pub fn new(constant: T) -> Self {
        Self {
            constant,
            binding: None,
        }
    }

    /// Creates a bound variable with `constant` as its fallback.
    pub fn bound(constant: T, binding: Binding) -> Self {
        Self {
            constant,
            binding: Some(binding),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Sets the binding. The constant is untouched.
    pub fn bind(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    /// Clears the binding. The constant is untouched.
    pub fn unbind(&mut self) {
        self.binding = None;
    }

    /// Clears the binding and replaces the constant.
    pub fn unbind_to(&mut self, constant: T) {
        self.binding = None;
        self.constant = constant;
    }
}

impl<T: Bindable> Variable<T> {
    /// Resolves the slot. Unbound slots always resolve to the constant.
    ///
    /// Returns `None` when the bound value is missing or cannot be coerced.
    pub fn resolve(
        &self,
        properties: &Properties,
        data: Option<&Value>,
        fetched_asset: Option<&AssetRef>,
    ) -> Option<T> {
        match &self.binding {
            None => Some(self.constant.clone()),
            Some(Binding::Property(name)) => properties.get(name).and_then(T::from_property),
            Some(Binding::KeyPath(path)) => {
                keypath::lookup(path, properties, data).and_then(T::from_found)
            }
            Some(Binding::FetchedAsset) => fetched_asset.and_then(T::from_asset),
        }
    }

    /// Resolves the slot, falling back to the constant.
    pub fn force_resolve(
        &self,
        properties: &Properties,
        data: Option<&Value>,
        fetched_asset: Option<&AssetRef>,
    ) -> T {
        self.resolve(properties, data, fetched_asset)
            .unwrap_or_else(|| self.constant.clone())
    }

    /// Resolves the binding and stores the result as the new constant.
    ///
    /// Returns false, leaving the constant as it was, when resolution fails.
    pub fn update_constant(
        &mut self,
        properties: &Properties,
        data: Option<&Value>,
        fetched_asset: Option<&AssetRef>,
    ) -> bool {
        match self.resolve(properties, data, fetched_asset) {
            Some(value) => {
                self.constant = value;
                true
            }
            None => false,
        }
    }
}

impl<T: Default> Default for Variable<T> {
    fn default() -> Self {
        Variable::new(T::default())
    }
}

impl<T> From<T> for Variable<T> {
    fn from(constant: T) -> Self {
        Variable::new(constant)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unbound_returns_constant() {
        let var = Variable::new(5.0);
        let props = Properties::new();
        assert_eq!(var.resolve(&props, None, None), Some(5.0));
    }

    #[test]
    fn test_property_binding() {
        let var = Variable::bound(5.0, Binding::Property("x".into()));
        let props = Properties::new().with("x", 7.0);
        assert_eq!(var.resolve(&props, None, None), Some(7.0));

        let empty = Properties::new();
        assert_eq!(var.resolve(&empty, None, None), None);
        assert_eq!(var.force_resolve(&empty, None, None), 5.0);
    }

    #[test]
    fn test_property_without_coercion_is_unresolved() {
        let var = Variable::bound(5.0, Binding::Property("x".into()));
        let props = Properties::new().with("x", AssetRef::named("logo"));
        assert_eq!(var.resolve(&props, None, None), None);
    }

    #[test]
    fn test_number_as_text_is_formatted() {
        let var = Variable::bound(String::new(), Binding::Property("count".into()));
        let props = Properties::new().with("count", 21.0);
        assert_eq!(var.resolve(&props, None, None), Some("21".to_string()));

        let props = Properties::new().with("count", 2.5);
        assert_eq!(var.resolve(&props, None, None), Some("2.5".to_string()));
    }

    #[test]
    fn test_number_as_bool_is_nonzero() {
        let var = Variable::bound(false, Binding::Property("flag".into()));
        assert_eq!(
            var.resolve(&Properties::new().with("flag", 3.0), None, None),
            Some(true)
        );
        assert_eq!(
            var.resolve(&Properties::new().with("flag", 0.0), None, None),
            Some(false)
        );
    }

    #[test]
    fn test_key_path_binding() {
        let var = Variable::bound(String::from("?"), Binding::KeyPath("data.user.name".into()));
        let data = json!({"user": {"name": "Ada", "age": 36}});
        let props = Properties::new();
        assert_eq!(var.resolve(&props, Some(&data), None), Some("Ada".to_string()));

        let age = Variable::bound(0.0, Binding::KeyPath("data.user.age".into()));
        assert_eq!(age.resolve(&props, Some(&data), None), Some(36.0));

        let text_age = Variable::bound(0.0, Binding::KeyPath("data.age".into()));
        assert_eq!(text_age.resolve(&props, Some(&json!({"age": " 17 "})), None), Some(17.0));
    }

    #[test]
    fn test_key_path_to_object_is_unresolved() {
        let var = Variable::bound(String::new(), Binding::KeyPath("data.user".into()));
        let data = json!({"user": {"name": "Ada"}});
        assert_eq!(var.resolve(&Properties::new(), Some(&data), None), None);
    }

    #[test]
    fn test_fetched_asset_only_for_asset_slots() {
        let asset = AssetRef::url("https://example.com/a.png");
        let image = Variable::bound(AssetRef::named("placeholder"), Binding::FetchedAsset);
        assert_eq!(
            image.resolve(&Properties::new(), None, Some(&asset)),
            Some(asset.clone())
        );
        assert_eq!(image.resolve(&Properties::new(), None, None), None);

        let text = Variable::bound(String::new(), Binding::FetchedAsset);
        assert_eq!(text.resolve(&Properties::new(), None, Some(&asset)), None);
    }

    #[test]
    fn test_update_constant() {
        let mut var = Variable::bound(1.0, Binding::Property("x".into()));

        assert!(!var.update_constant(&Properties::new(), None, None));
        assert_eq!(var.constant, 1.0);
        assert!(var.is_bound());

        assert!(var.update_constant(&Properties::new().with("x", 9.0), None, None));
        assert_eq!(var.constant, 9.0);
        assert!(var.is_bound());
    }

    #[test]
    fn test_bind_and_unbind_are_independent_of_constant() {
        let mut var = Variable::new("a".to_string());
        var.bind(Binding::Property("p".into()));
        assert_eq!(var.constant, "a");

        var.constant = "b".to_string();
        assert_eq!(var.binding, Some(Binding::Property("p".into())));

        var.unbind();
        assert_eq!(var.constant, "b");
        assert!(!var.is_bound());

        var.bind(Binding::FetchedAsset);
        var.unbind_to("c".to_string());
        assert_eq!(var, Variable::new("c".to_string()));
    }
}
