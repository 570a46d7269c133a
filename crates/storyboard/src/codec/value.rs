//! JSON codecs for values: colors, fills, variables, properties, scalars
//! and query descriptors.
//!
//! Decoders take the field path used in error messages; encoders take the
//! same path for non-finite number reports.

use rustc_hash::FxHashSet;
use serde_json::{Map, Value, json};

use crate::binding::{AssetRef, Binding, Properties, PropertyValue, Variable};
use crate::codec::primitives::{Fields, ObjectWriter, finite, index_path, join, to_wire};
use crate::error::{DecodeError, EncodeError};
use crate::model::{
    Action, Color, ColorIndex, Document, Fill, FontStyle, Frame, GradientIndex, Id, Insets,
    LineLimit, NodeIndex, ResourceId, Shadow,
};
use crate::query::{Condition, Limit, Predicate, Scalar, SortDescriptor};
use crate::util::Timestamp;

// =============================================================================
// ENCODE CONTEXT
// =============================================================================

/// Lookups needed to write links as ids.
///
/// Node links resolve only to nodes that are being written, so a link never
/// names a node missing from the output.
pub(crate) struct EncodeContext<'a> {
    doc: &'a Document,
    written: FxHashSet<NodeIndex>,
}

impl<'a> EncodeContext<'a> {
    pub fn new(doc: &'a Document, written: impl IntoIterator<Item = NodeIndex>) -> Self {
        Self {
            doc,
            written: written.into_iter().collect(),
        }
    }

    /// Id of a written node, or `None` for a link leaving the output.
    pub fn node_id(&self, index: NodeIndex) -> Option<&'a Id> {
        if !self.written.contains(&index) {
            return None;
        }
        self.doc.graph.get(index).map(|node| node.id())
    }

    fn color_id(&self, index: ColorIndex, path: &str) -> Result<&'a ResourceId, EncodeError> {
        self.doc
            .colors
            .get(index.0 as usize)
            .map(|color| &color.id)
            .ok_or_else(|| EncodeError::DanglingReference {
                path: path.to_string(),
                target: format!("color #{}", index.0),
            })
    }

    fn gradient_id(&self, index: GradientIndex, path: &str) -> Result<&'a ResourceId, EncodeError> {
        self.doc
            .gradients
            .get(index.0 as usize)
            .map(|gradient| &gradient.id)
            .ok_or_else(|| EncodeError::DanglingReference {
                path: path.to_string(),
                target: format!("gradient #{}", index.0),
            })
    }
}

// =============================================================================
// COLORS AND FILLS
// =============================================================================

pub(crate) fn decode_color(value: &Value, path: &str) -> Result<Color, DecodeError> {
    let fields = Fields::of(value, path)?;
    Ok(Color {
        red: fields.number("red")?,
        green: fields.number("green")?,
        blue: fields.number("blue")?,
        alpha: fields.number_or("alpha", 1.0)?,
    })
}

pub(crate) fn encode_color(color: &Color, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.number("red", color.red)?;
    out.number("green", color.green)?;
    out.number("blue", color.blue)?;
    out.number("alpha", color.alpha)?;
    Ok(out.into_value())
}

/// A fill as written on the wire: a literal, or a reference to a document
/// resource still to be resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FillWire {
    Literal(Fill),
    Color(ResourceId),
    Gradient(ResourceId),
}

pub(crate) fn decode_fill(value: &Value, path: &str) -> Result<FillWire, DecodeError> {
    let fields = Fields::of(value, path)?;
    if let Some(color) = fields.opt("color") {
        return Ok(FillWire::Literal(Fill::Color(decode_color(color, &fields.at("color"))?)));
    }
    if let Some(id) = fields.opt_resource_id("colorID")? {
        return Ok(FillWire::Color(id));
    }
    if let Some(id) = fields.opt_resource_id("gradientID")? {
        return Ok(FillWire::Gradient(id));
    }
    Err(DecodeError::invalid(path, "color, colorID or gradientID"))
}

pub(crate) fn encode_fill(fill: &Fill, ctx: &EncodeContext<'_>, path: &str) -> Result<Value, EncodeError> {
    Ok(match fill {
        Fill::Color(color) => json!({"color": encode_color(color, &join(path, "color"))?}),
        Fill::Swatch(index) => json!({"colorID": ctx.color_id(*index, path)?.as_str()}),
        Fill::Gradient(index) => json!({"gradientID": ctx.gradient_id(*index, path)?.as_str()}),
    })
}

// =============================================================================
// GEOMETRY AND TYPOGRAPHY
// =============================================================================

pub(crate) fn decode_insets(value: &Value, path: &str) -> Result<Insets, DecodeError> {
    let fields = Fields::of(value, path)?;
    Ok(Insets {
        top: fields.number_or("top", 0.0)?,
        leading: fields.number_or("leading", 0.0)?,
        bottom: fields.number_or("bottom", 0.0)?,
        trailing: fields.number_or("trailing", 0.0)?,
    })
}

pub(crate) fn encode_insets(insets: &Insets, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.number("top", insets.top)?;
    out.number("leading", insets.leading)?;
    out.number("bottom", insets.bottom)?;
    out.number("trailing", insets.trailing)?;
    Ok(out.into_value())
}

pub(crate) fn decode_frame(value: &Value, path: &str) -> Result<Frame, DecodeError> {
    let fields = Fields::of(value, path)?;
    Ok(Frame {
        width: fields.opt_number("width")?,
        height: fields.opt_number("height")?,
        min_width: fields.opt_number("minWidth")?,
        max_width: fields.opt_number("maxWidth")?,
        min_height: fields.opt_number("minHeight")?,
        max_height: fields.opt_number("maxHeight")?,
    })
}

pub(crate) fn encode_frame(frame: &Frame, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.opt_number("width", frame.width)?;
    out.opt_number("height", frame.height)?;
    out.opt_number("minWidth", frame.min_width)?;
    out.opt_number("maxWidth", frame.max_width)?;
    out.opt_number("minHeight", frame.min_height)?;
    out.opt_number("maxHeight", frame.max_height)?;
    Ok(out.into_value())
}

/// Decodes a shadow. A referenced fill is returned separately and the
/// shadow's own fill left unset until it resolves.
pub(crate) fn decode_shadow(value: &Value, path: &str) -> Result<(Shadow, Option<FillWire>), DecodeError> {
    let fields = Fields::of(value, path)?;
    let fill = fields
        .opt("fill")
        .map(|fill| decode_fill(fill, &fields.at("fill")))
        .transpose()?;
    let shadow = Shadow {
        fill: match &fill {
            Some(FillWire::Literal(fill)) => Some(*fill),
            _ => None,
        },
        x: fields.number_or("x", 0.0)?,
        y: fields.number_or("y", 0.0)?,
        radius: fields.number_or("radius", 0.0)?,
    };
    let pending = fill.filter(|f| !matches!(f, FillWire::Literal(_)));
    Ok((shadow, pending))
}

pub(crate) fn encode_shadow(shadow: &Shadow, ctx: &EncodeContext<'_>, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    if let Some(fill) = &shadow.fill {
        out.put("fill", encode_fill(fill, ctx, &out.at("fill"))?);
    }
    out.number("x", shadow.x)?;
    out.number("y", shadow.y)?;
    out.number("radius", shadow.radius)?;
    Ok(out.into_value())
}

pub(crate) fn decode_font(value: &Value, path: &str) -> Result<FontStyle, DecodeError> {
    let fields = Fields::of(value, path)?;
    let defaults = FontStyle::default();
    Ok(FontStyle {
        family: fields.opt_string("family")?,
        size: fields.number_or("size", defaults.size)?,
        weight: fields.enum_or_default("weight", "font weight")?,
    })
}

pub(crate) fn encode_font(font: &FontStyle, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.put_opt("family", font.family.clone());
    out.number("size", font.size)?;
    out.wire("weight", &font.weight)?;
    Ok(out.into_value())
}

pub(crate) fn decode_line_limit(value: &Value, path: &str) -> Result<LineLimit, DecodeError> {
    let fields = Fields::of(value, path)?;
    Ok(LineLimit {
        min: fields.opt_u32("min")?,
        max: fields.opt_u32("max")?,
    })
}

pub(crate) fn encode_line_limit(limit: &LineLimit) -> Value {
    json!({"min": limit.min, "max": limit.max})
}

// =============================================================================
// VARIABLES AND BINDINGS
// =============================================================================

/// Types a [`Variable`] constant can hold on the wire.
pub(crate) trait WireValue: Sized {
    const EXPECTED: &'static str;

    fn decode_wire(value: &Value, path: &str) -> Result<Self, DecodeError>;

    fn encode_wire(&self, path: &str) -> Result<Value, EncodeError>;
}

impl WireValue for String {
    const EXPECTED: &'static str = "string";

    fn decode_wire(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DecodeError::invalid(path, Self::EXPECTED))
    }

    fn encode_wire(&self, _path: &str) -> Result<Value, EncodeError> {
        Ok(Value::String(self.clone()))
    }
}

impl WireValue for f64 {
    const EXPECTED: &'static str = "number";

    fn decode_wire(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_f64()
            .ok_or_else(|| DecodeError::invalid(path, Self::EXPECTED))
    }

    fn encode_wire(&self, path: &str) -> Result<Value, EncodeError> {
        finite(|| path.to_string(), *self)
    }
}

impl WireValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn decode_wire(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_bool()
            .ok_or_else(|| DecodeError::invalid(path, Self::EXPECTED))
    }

    fn encode_wire(&self, _path: &str) -> Result<Value, EncodeError> {
        Ok(Value::Bool(*self))
    }
}

impl WireValue for AssetRef {
    const EXPECTED: &'static str = "asset";

    fn decode_wire(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let fields = Fields::of(value, path)?;
        if let Some(name) = fields.opt_string("name")? {
            return Ok(AssetRef::Named(name));
        }
        if let Some(url) = fields.opt_string("url")? {
            return Ok(AssetRef::Url(url));
        }
        Err(DecodeError::invalid(path, "asset with name or url"))
    }

    fn encode_wire(&self, _path: &str) -> Result<Value, EncodeError> {
        Ok(match self {
            AssetRef::Named(name) => json!({"name": name}),
            AssetRef::Url(url) => json!({"url": url}),
        })
    }
}

pub(crate) fn decode_binding(value: &Value, path: &str) -> Result<Binding, DecodeError> {
    let fields = Fields::of(value, path)?;
    match fields.string("kind")?.as_str() {
        "property" => Ok(Binding::Property(fields.string("name")?)),
        "keyPath" => Ok(Binding::KeyPath(fields.string("keyPath")?)),
        "fetchedAsset" => Ok(Binding::FetchedAsset),
        _ => Err(DecodeError::invalid(
            fields.at("kind"),
            "property, keyPath or fetchedAsset",
        )),
    }
}

pub(crate) fn encode_binding(binding: &Binding) -> Value {
    match binding {
        Binding::Property(name) => json!({"kind": "property", "name": name}),
        Binding::KeyPath(key_path) => json!({"kind": "keyPath", "keyPath": key_path}),
        Binding::FetchedAsset => json!({"kind": "fetchedAsset"}),
    }
}

pub(crate) fn decode_variable<T: WireValue>(value: &Value, path: &str) -> Result<Variable<T>, DecodeError> {
    let fields = Fields::of(value, path)?;
    let constant = T::decode_wire(fields.required("constant")?, &fields.at("constant"))?;
    let binding = fields
        .opt("binding")
        .map(|b| decode_binding(b, &fields.at("binding")))
        .transpose()?;
    Ok(Variable { constant, binding })
}

pub(crate) fn encode_variable<T: WireValue>(variable: &Variable<T>, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.put("constant", variable.constant.encode_wire(&out.at("constant"))?);
    if let Some(binding) = &variable.binding {
        out.put("binding", encode_binding(binding));
    }
    Ok(out.into_value())
}

// =============================================================================
// PROPERTIES AND SCALARS
// =============================================================================

pub(crate) fn decode_property_value(value: &Value, path: &str) -> Result<PropertyValue, DecodeError> {
    let fields = Fields::of(value, path)?;
    let raw = fields.required("value")?;
    let value_path = fields.at("value");
    Ok(match fields.string("type")?.as_str() {
        "text" => PropertyValue::Text(String::decode_wire(raw, &value_path)?),
        "number" => PropertyValue::Number(f64::decode_wire(raw, &value_path)?),
        "boolean" => PropertyValue::Boolean(bool::decode_wire(raw, &value_path)?),
        "image" => PropertyValue::Image(AssetRef::decode_wire(raw, &value_path)?),
        _ => return Err(DecodeError::invalid(fields.at("type"), "text, number, boolean or image")),
    })
}

pub(crate) fn encode_property_value(value: &PropertyValue, path: &str) -> Result<Value, EncodeError> {
    let value_path = join(path, "value");
    let encoded = match value {
        PropertyValue::Text(text) => text.encode_wire(&value_path)?,
        PropertyValue::Number(n) => n.encode_wire(&value_path)?,
        PropertyValue::Boolean(b) => b.encode_wire(&value_path)?,
        PropertyValue::Image(asset) => asset.encode_wire(&value_path)?,
    };
    Ok(json!({"type": value.kind_name(), "value": encoded}))
}

/// Property table: an object of name → typed value.
pub(crate) fn decode_properties(value: &Value, path: &str) -> Result<Properties, DecodeError> {
    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::invalid(path, "object"))?;
    let mut properties = Properties::new();
    for (name, entry) in object {
        properties.insert(name.clone(), decode_property_value(entry, &join(path, name))?);
    }
    Ok(properties)
}

pub(crate) fn encode_properties(properties: &Properties, path: &str) -> Result<Value, EncodeError> {
    let mut out = Map::new();
    for (name, value) in properties.iter() {
        out.insert(name.to_string(), encode_property_value(value, &join(path, name))?);
    }
    Ok(Value::Object(out))
}

pub(crate) fn decode_scalar(value: &Value, path: &str) -> Result<Scalar, DecodeError> {
    let fields = Fields::of(value, path)?;
    let value_path = fields.at("value");
    let raw = || fields.required("value");
    Ok(match fields.string("type")?.as_str() {
        "null" => Scalar::Null,
        "text" => Scalar::Text(String::decode_wire(raw()?, &value_path)?),
        "number" => Scalar::Number(f64::decode_wire(raw()?, &value_path)?),
        "boolean" => Scalar::Boolean(bool::decode_wire(raw()?, &value_path)?),
        "date" => {
            let text = String::decode_wire(raw()?, &value_path)?;
            Scalar::Date(
                Timestamp::parse(&text)
                    .map_err(|_| DecodeError::invalid(value_path, "RFC 3339 date"))?,
            )
        }
        _ => {
            return Err(DecodeError::invalid(
                fields.at("type"),
                "text, number, boolean, date or null",
            ));
        }
    })
}

pub(crate) fn encode_scalar(scalar: &Scalar, path: &str) -> Result<Value, EncodeError> {
    let value = match scalar {
        Scalar::Text(text) => Value::String(text.clone()),
        Scalar::Number(n) => finite(|| join(path, "value"), *n)?,
        Scalar::Boolean(b) => Value::Bool(*b),
        Scalar::Date(ts) => Value::String(ts.to_rfc3339()),
        Scalar::Null => Value::Null,
    };
    Ok(json!({"type": scalar.kind_name(), "value": value}))
}

// =============================================================================
// QUERY DESCRIPTORS
// =============================================================================

pub(crate) fn decode_condition(value: &Value, path: &str) -> Result<Condition, DecodeError> {
    let fields = Fields::of(value, path)?;
    let predicate_name = fields.string("predicate")?;
    let predicate = Predicate::from_wire_name(&predicate_name)
        .ok_or_else(|| DecodeError::invalid(fields.at("predicate"), "predicate"))?;
    Ok(Condition {
        key_path: fields.string("keyPath")?,
        predicate,
        value: fields
            .opt("value")
            .map(|v| decode_scalar(v, &fields.at("value")))
            .transpose()?,
    })
}

pub(crate) fn encode_condition(condition: &Condition, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.put("keyPath", condition.key_path.clone());
    out.put("predicate", condition.predicate.wire_name());
    if let Some(value) = &condition.value {
        out.put("value", encode_scalar(value, &out.at("value"))?);
    }
    Ok(out.into_value())
}

pub(crate) fn decode_conditions(fields: &Fields<'_>, key: &str) -> Result<Vec<Condition>, DecodeError> {
    let path = fields.at(key);
    fields
        .array(key)?
        .iter()
        .enumerate()
        .map(|(i, c)| decode_condition(c, &index_path(&path, i)))
        .collect()
}

pub(crate) fn encode_conditions(conditions: &[Condition], path: &str) -> Result<Value, EncodeError> {
    conditions
        .iter()
        .enumerate()
        .map(|(i, c)| encode_condition(c, &index_path(path, i)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

pub(crate) fn decode_sort_descriptor(value: &Value, path: &str) -> Result<SortDescriptor, DecodeError> {
    let fields = Fields::of(value, path)?;
    Ok(SortDescriptor {
        key_path: fields.string("keyPath")?,
        ascending: fields.bool_or("ascending", true)?,
    })
}

pub(crate) fn encode_sort_descriptor(descriptor: &SortDescriptor) -> Value {
    json!({"keyPath": descriptor.key_path, "ascending": descriptor.ascending})
}

pub(crate) fn decode_limit(value: &Value, path: &str) -> Result<Limit, DecodeError> {
    let fields = Fields::of(value, path)?;
    Ok(Limit {
        show: fields.u32("show")?,
        start_at: fields.opt_u32("startAt")?.unwrap_or(1),
    })
}

pub(crate) fn encode_limit(limit: &Limit) -> Value {
    json!({"show": limit.show, "startAt": limit.start_at})
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Decodes an action. A navigation target is returned as an id to resolve;
/// the action's own screen link starts unset.
pub(crate) fn decode_action(value: &Value, path: &str) -> Result<(Action, Option<Id>), DecodeError> {
    let fields = Fields::of(value, path)?;
    let action = match fields.string("type")?.as_str() {
        "close" => Action::Close,
        "dismiss" => Action::Dismiss,
        "navigate" => {
            return Ok((Action::NavigateTo { screen: None }, fields.opt_id("screenID")?));
        }
        "openURL" => Action::OpenUrl {
            url: decode_variable(fields.required("url")?, &fields.at("url"))?,
        },
        "custom" => Action::Custom {
            identifier: fields.string("identifier")?,
        },
        _ => {
            return Err(DecodeError::invalid(
                fields.at("type"),
                "close, dismiss, navigate, openURL or custom",
            ));
        }
    };
    Ok((action, None))
}

pub(crate) fn encode_action(action: &Action, ctx: &EncodeContext<'_>, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.put("type", action.type_name());
    match action {
        Action::Close | Action::Dismiss => {}
        Action::NavigateTo { screen } => {
            let target = screen.and_then(|s| ctx.node_id(s));
            out.put_opt("screenID", target.map(Id::to_string));
        }
        Action::OpenUrl { url } => {
            out.put("url", encode_variable(url, &out.at("url"))?);
        }
        Action::Custom { identifier } => out.put("identifier", identifier.clone()),
    }
    Ok(out.into_value())
}

/// Serializes a plain serde value (annotations) with a path for errors.
pub(crate) fn encode_plain<T: serde::Serialize>(value: &T, path: &str) -> Result<Value, EncodeError> {
    to_wire(|| path.to_string(), value)
}
