//! Node encoding and decoding.
//!
//! A decoded node carries its links as ids ([`NodeLinks`]); the document
//! decoder registers them with the resolver once the node has an index.

use serde_json::Value;

use crate::binding::{AssetRef, Properties};
use crate::codec::migration;
use crate::codec::primitives::{Fields, ObjectWriter, index_path};
use crate::codec::value::{
    EncodeContext, FillWire, decode_action, decode_conditions, decode_fill, decode_font,
    decode_frame, decode_insets, decode_limit, decode_line_limit, decode_properties,
    decode_shadow, decode_sort_descriptor, decode_variable, encode_action, encode_conditions,
    encode_fill, encode_font, encode_frame, encode_insets, encode_limit, encode_line_limit,
    encode_plain, encode_properties, encode_shadow, encode_sort_descriptor, encode_variable,
};
use crate::error::{DecodeError, EncodeError};
use crate::model::{
    Accessibility, ComponentInstance, DataSource, Fill, Header, Id, Image, LineLimit,
    MainComponent, Metadata, Node, NodeKind, Rectangle, Screen, Stack, Text,
};
use crate::query::{Collection, Conditional};
use crate::resolve::PaintSlot;

/// Outgoing references of a decoded node, still as ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NodeLinks {
    pub children: Vec<Id>,
    pub background: Option<Id>,
    pub overlay: Option<Id>,
    pub mask: Option<Id>,
    pub action_target: Option<Id>,
    pub component: Option<Id>,
    /// Fills naming a document color or gradient.
    pub paints: Vec<(PaintSlot, FillWire)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedNode {
    pub node: Node,
    pub links: NodeLinks,
}

/// Decodes the node at `nodes[position]` of a document at `version`.
pub(crate) fn decode_node(value: &Value, version: u32, position: usize) -> Result<DecodedNode, DecodeError> {
    let element_path = index_path("nodes", position);
    let header = Fields::of(value, &element_path)?;
    let type_name = header.string("__typeName")?;
    let id = header.id("id")?;
    let path = format!("{type_name} {id}");

    let mut object = header_object(value);
    migration::upgrade(&mut object, version, migration::NODE, &path)?;
    migration::upgrade(&mut object, version, migration::steps_for(&type_name), &path)?;
    let fields = Fields::new(&object, &path);

    let mut links = NodeLinks {
        children: fields.id_list("childIDs")?,
        background: fields.opt_id("backgroundID")?,
        overlay: fields.opt_id("overlayID")?,
        mask: fields.opt_id("maskID")?,
        ..NodeLinks::default()
    };

    let kind = decode_kind(&type_name, &id, &fields, &mut links)?;
    let mut node = Node::new(id, kind);
    node.name = fields.opt_string("name")?;

    let facets = &mut node.facets;
    facets.padding = fields
        .opt("padding")
        .map(|v| decode_insets(v, &fields.at("padding")))
        .transpose()?;
    facets.frame = fields
        .opt("frame")
        .map(|v| decode_frame(v, &fields.at("frame")))
        .transpose()?;
    if let Some(v) = fields.opt("shadow") {
        let (shadow, pending) = decode_shadow(v, &fields.at("shadow"))?;
        facets.shadow = Some(shadow);
        if let Some(wire) = pending {
            links.paints.push((PaintSlot::ShadowColor, wire));
        }
    }
    facets.opacity = fields.opt_number("opacity")?;
    if let Some(v) = fields.opt("action") {
        let (action, target) = decode_action(v, &fields.at("action"))?;
        facets.action = Some(action);
        links.action_target = target;
    }
    facets.accessibility = annotation::<Accessibility>(&fields, "accessibility")?;
    facets.metadata = annotation::<Metadata>(&fields, "metadata")?;

    Ok(DecodedNode { node, links })
}

fn header_object(value: &Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn annotation<T: serde::de::DeserializeOwned>(fields: &Fields<'_>, key: &str) -> Result<Option<T>, DecodeError> {
    fields
        .opt(key)
        .map(|v| serde_json::from_value(v.clone()).map_err(|_| DecodeError::invalid(fields.at(key), "object")))
        .transpose()
}

/// A literal fill is returned; a resource reference is queued on `links`.
fn split_fill(wire: FillWire, slot: PaintSlot, links: &mut NodeLinks) -> Option<Fill> {
    match wire {
        FillWire::Literal(fill) => Some(fill),
        pending => {
            links.paints.push((slot, pending));
            None
        }
    }
}

fn opt_fill(
    fields: &Fields<'_>,
    key: &str,
    slot: PaintSlot,
    links: &mut NodeLinks,
) -> Result<Option<Fill>, DecodeError> {
    Ok(match fields.opt(key) {
        Some(v) => split_fill(decode_fill(v, &fields.at(key))?, slot, links),
        None => None,
    })
}

fn decode_kind(type_name: &str, id: &Id, fields: &Fields<'_>, links: &mut NodeLinks) -> Result<NodeKind, DecodeError> {
    let kind = match type_name {
        "Screen" => NodeKind::Screen(Screen {
            title: fields.opt_string("title")?,
        }),
        "Stack" => NodeKind::Stack(Stack {
            axis: fields.enum_or_default("axis", "axis")?,
            spacing: fields.number_or("spacing", 0.0)?,
            alignment: fields.enum_or_default("alignment", "alignment")?,
        }),
        "Text" => NodeKind::Text(Text {
            text: decode_variable(fields.required("text")?, &fields.at("text"))?,
            font: fields
                .opt("font")
                .map(|v| decode_font(v, &fields.at("font")))
                .transpose()?
                .unwrap_or_default(),
            color: opt_fill(fields, "color", PaintSlot::TextColor, links)?,
            alignment: fields.enum_or_default("alignment", "text alignment")?,
            line_limit: fields
                .opt("lineLimit")
                .map(|v| decode_line_limit(v, &fields.at("lineLimit")))
                .transpose()?
                .unwrap_or_else(LineLimit::unlimited),
        }),
        "Image" => NodeKind::Image(Image {
            source: decode_variable::<AssetRef>(fields.required("source")?, &fields.at("source"))?,
            resizing: fields.enum_or_default("resizing", "resizing mode")?,
        }),
        "Rectangle" => NodeKind::Rectangle(Rectangle {
            fill: opt_fill(fields, "fill", PaintSlot::Fill, links)?,
            corner_radius: fields.number_or("cornerRadius", 0.0)?,
        }),
        "Spacer" => NodeKind::Spacer,
        "Collection" => {
            let sort_path = fields.at("sortDescriptors");
            NodeKind::Collection(Collection {
                key_path: fields.string("keyPath")?,
                filters: decode_conditions(fields, "filters")?,
                sort_descriptors: fields
                    .array("sortDescriptors")?
                    .iter()
                    .enumerate()
                    .map(|(i, v)| decode_sort_descriptor(v, &index_path(&sort_path, i)))
                    .collect::<Result<_, _>>()?,
                limit: fields
                    .opt("limit")
                    .map(|v| decode_limit(v, &fields.at("limit")))
                    .transpose()?,
            })
        }
        "Conditional" => NodeKind::Conditional(Conditional {
            conditions: decode_conditions(fields, "conditions")?,
        }),
        "DataSource" => {
            let headers_path = fields.at("headers");
            NodeKind::DataSource(DataSource {
                url: decode_variable(fields.required("url")?, &fields.at("url"))?,
                method: fields.enum_or_default("method", "HTTP method")?,
                headers: fields
                    .array("headers")?
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let path = index_path(&headers_path, i);
                        let header = Fields::of(v, &path)?;
                        Ok(Header {
                            key: header.string("key")?,
                            value: header.string("value")?,
                        })
                    })
                    .collect::<Result<_, DecodeError>>()?,
                body: fields.opt_string("body")?,
                polling_interval: fields.opt_number("pollingInterval")?,
            })
        }
        "MainComponent" => NodeKind::MainComponent(MainComponent::new(opt_properties(fields, "properties")?)),
        "ComponentInstance" => {
            links.component = fields.opt_id("componentID")?;
            NodeKind::ComponentInstance(ComponentInstance {
                component: None,
                overrides: opt_properties(fields, "overrides")?,
            })
        }
        _ => {
            return Err(DecodeError::UnknownNodeType {
                id: id.to_string(),
                type_name: type_name.to_string(),
            });
        }
    };
    Ok(kind)
}

fn opt_properties(fields: &Fields<'_>, key: &str) -> Result<Properties, DecodeError> {
    Ok(fields
        .opt(key)
        .map(|v| decode_properties(v, &fields.at(key)))
        .transpose()?
        .unwrap_or_default())
}

/// Encodes `node` in the current layout. Links to nodes outside the
/// written set are omitted; `parent` and component instances are implied
/// by the other side and never written.
pub(crate) fn encode_node(node: &Node, ctx: &EncodeContext<'_>) -> Result<Value, EncodeError> {
    let path = format!("{} {}", node.type_name(), node.id());
    let mut out = ObjectWriter::new(&path);
    out.put("__typeName", node.type_name());
    out.put("id", node.id().as_str());
    out.put_opt("name", node.name.clone());
    out.put(
        "childIDs",
        node.children()
            .iter()
            .filter_map(|child| ctx.node_id(*child))
            .map(|id| Value::from(id.as_str()))
            .collect::<Vec<_>>(),
    );

    let facets = &node.facets;
    if let Some(padding) = &facets.padding {
        out.put("padding", encode_insets(padding, &out.at("padding"))?);
    }
    if let Some(frame) = &facets.frame {
        out.put("frame", encode_frame(frame, &out.at("frame"))?);
    }
    if let Some(shadow) = &facets.shadow {
        out.put("shadow", encode_shadow(shadow, ctx, &out.at("shadow"))?);
    }
    out.opt_number("opacity", facets.opacity)?;
    for (key, link) in [
        ("backgroundID", facets.background),
        ("overlayID", facets.overlay),
        ("maskID", facets.mask),
    ] {
        out.put_opt(key, link.and_then(|index| ctx.node_id(index)).map(Id::as_str));
    }
    if let Some(action) = &facets.action {
        out.put("action", encode_action(action, ctx, &out.at("action"))?);
    }
    if let Some(accessibility) = &facets.accessibility {
        out.put("accessibility", encode_plain(accessibility, &out.at("accessibility"))?);
    }
    if let Some(metadata) = &facets.metadata {
        out.put("metadata", encode_plain(metadata, &out.at("metadata"))?);
    }

    encode_kind(&node.kind, ctx, &mut out)?;
    Ok(out.into_value())
}

fn encode_kind(kind: &NodeKind, ctx: &EncodeContext<'_>, out: &mut ObjectWriter<'_>) -> Result<(), EncodeError> {
    match kind {
        NodeKind::Screen(screen) => out.put_opt("title", screen.title.clone()),
        NodeKind::Stack(stack) => {
            out.wire("axis", &stack.axis)?;
            out.number("spacing", stack.spacing)?;
            out.wire("alignment", &stack.alignment)?;
        }
        NodeKind::Text(text) => {
            out.put("text", encode_variable(&text.text, &out.at("text"))?);
            out.put("font", encode_font(&text.font, &out.at("font"))?);
            if let Some(color) = &text.color {
                out.put("color", encode_fill(color, ctx, &out.at("color"))?);
            }
            out.wire("alignment", &text.alignment)?;
            out.put("lineLimit", encode_line_limit(&text.line_limit));
        }
        NodeKind::Image(image) => {
            out.put("source", encode_variable(&image.source, &out.at("source"))?);
            out.wire("resizing", &image.resizing)?;
        }
        NodeKind::Rectangle(rectangle) => {
            if let Some(fill) = &rectangle.fill {
                out.put("fill", encode_fill(fill, ctx, &out.at("fill"))?);
            }
            out.number("cornerRadius", rectangle.corner_radius)?;
        }
        NodeKind::Spacer => {}
        NodeKind::Collection(collection) => {
            out.put("keyPath", collection.key_path.clone());
            out.put("filters", encode_conditions(&collection.filters, &out.at("filters"))?);
            out.put(
                "sortDescriptors",
                collection
                    .sort_descriptors
                    .iter()
                    .map(encode_sort_descriptor)
                    .collect::<Vec<_>>(),
            );
            if let Some(limit) = &collection.limit {
                out.put("limit", encode_limit(limit));
            }
        }
        NodeKind::Conditional(conditional) => {
            out.put(
                "conditions",
                encode_conditions(&conditional.conditions, &out.at("conditions"))?,
            );
        }
        NodeKind::DataSource(source) => {
            out.put("url", encode_variable(&source.url, &out.at("url"))?);
            out.wire("method", &source.method)?;
            out.put(
                "headers",
                source
                    .headers
                    .iter()
                    .map(|h| serde_json::json!({"key": h.key, "value": h.value}))
                    .collect::<Vec<_>>(),
            );
            out.put_opt("body", source.body.clone());
            out.opt_number("pollingInterval", source.polling_interval)?;
        }
        NodeKind::MainComponent(main) => {
            out.put("properties", encode_properties(&main.properties, &out.at("properties"))?);
        }
        NodeKind::ComponentInstance(instance) => {
            out.put_opt(
                "componentID",
                instance.component().and_then(|c| ctx.node_id(c)).map(Id::as_str),
            );
            out.put("overrides", encode_properties(&instance.overrides, &out.at("overrides"))?);
        }
    }
    Ok(())
}
