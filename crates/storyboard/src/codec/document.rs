//! Document encoding and decoding.
//!
//! A document is a JSON object, optionally wrapped in a zstd envelope:
//!
//! ```text
//! SBDZ | varint uncompressed size | zstd frame
//! ```
//!
//! Decoding reads the header first, so every later branch knows the
//! document's format version. Nodes and resources are decoded next, their
//! references are registered with a [`Coordinator`], and a single
//! resolution pass links everything once all targets exist.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Read;

use rustc_hash::FxHashSet;
use serde_json::{Map, Value, json};

use crate::codec::migration::{self, Object};
use crate::codec::node::{decode_node, encode_node};
use crate::codec::primitives::{Fields, ObjectWriter, Reader, Writer, index_path, to_wire};
use crate::codec::value::{EncodeContext, FillWire, decode_color, encode_color};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{CURRENT_VERSION, MAGIC_COMPRESSED, MAX_DOCUMENT_SIZE, MIN_SUPPORTED_VERSION};
use crate::model::{
    Authorizer, Document, DocumentColor, DocumentFont, DocumentGradient, GradientStop, HttpMethod,
    Meta, NodeIndex, NodeKind, Point, ResourceId, Segue, UrlParameter,
};
use crate::resolve::{
    Coordinator, DocumentListSlot, DocumentSlot, Inverse, ListField, NodeField, ResolutionReport,
};

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for decoding documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail the load on any unresolved or conflicting reference instead of
    /// logging it and dropping the link.
    pub strict_references: bool,
    /// Largest accepted input, compressed and decompressed alike.
    pub max_document_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_references: false,
            max_document_size: MAX_DOCUMENT_SIZE,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that reject documents with integrity faults.
    pub fn strict() -> Self {
        Self {
            strict_references: true,
            ..Self::default()
        }
    }
}

/// Options for encoding documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Indent the JSON output.
    pub pretty: bool,
    /// Written as `meta.appVersion` in place of the document's own value.
    pub app_version: Option<String>,
    /// Written as `meta.build` in place of the document's own value.
    pub build: Option<String>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a document with the default options.
///
/// Accepts plain JSON and the `SBDZ` compressed envelope. Integrity faults
/// are logged and the affected links left unset; use
/// [`decode_document_with_options`] to collect or reject them.
pub fn decode_document(input: &[u8]) -> Result<Document, DecodeError> {
    decode_document_with_options(input, &DecodeOptions::default()).map(|(doc, _)| doc)
}

/// Decodes a document and reports the links that did not resolve.
///
/// Either a fully resolved document is returned or an error; a partial
/// graph never escapes.
pub fn decode_document_with_options(
    input: &[u8],
    options: &DecodeOptions,
) -> Result<(Document, ResolutionReport), DecodeError> {
    check_size("document", input.len(), options.max_document_size)?;

    let json: Cow<'_, [u8]> = match input.strip_prefix(MAGIC_COMPRESSED) {
        Some(envelope) => Cow::Owned(decompress_zstd(envelope, options.max_document_size)?),
        None => Cow::Borrowed(input),
    };
    let root: Value =
        serde_json::from_slice(&json).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let root = root.as_object().ok_or(DecodeError::RootNotObject)?;
    let fields = Fields::new(root, "");

    let meta = decode_meta(&fields)?;
    log::debug!(
        "decoding document v{} (compatibility v{})",
        meta.version,
        meta.compatibility_version
    );
    let version = meta.version;

    let mut doc = Document {
        meta,
        ..Document::default()
    };
    decode_resources(&fields, &mut doc)?;

    let mut coordinator = Coordinator::new();
    coordinator.require_reachable();
    decode_nodes(&fields, version, &mut doc, &mut coordinator)?;

    coordinator.register_document_many(DocumentListSlot::Screens, fields.id_list("screenIDs")?);
    match fields.opt_id("initialScreenID")? {
        Some(initial) => coordinator.register_document_one(DocumentSlot::InitialScreen, initial),
        None => coordinator.defer(|doc| doc.initial_screen = doc.screens.first().copied()),
    }
    let segues_path = fields.at("segues");
    for (i, value) in fields.array("segues")?.iter().enumerate() {
        let path = index_path(&segues_path, i);
        let segue = Fields::of(value, &path)?;
        coordinator.register_document_one(DocumentSlot::SegueSource(i), segue.id("sourceID")?);
        coordinator.register_document_one(DocumentSlot::SegueDestination(i), segue.id("destinationID")?);
        doc.segues.push(Segue {
            source: None,
            destination: None,
            style: segue.enum_or_default("style", "segue style")?,
        });
    }

    let report = coordinator.resolve(&mut doc, options)?;
    log::debug!(
        "decoded {} node(s) on {} screen(s)",
        doc.graph.len(),
        doc.screens.len()
    );
    Ok((doc, report))
}

fn check_size(field: &'static str, len: usize, max: usize) -> Result<(), DecodeError> {
    if len > max {
        return Err(DecodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

fn decompress_zstd(envelope: &[u8], max_size: usize) -> Result<Vec<u8>, DecodeError> {
    let mut reader = Reader::new(envelope);
    let declared_size = reader.read_varint("uncompressed_size")? as usize;
    check_size("uncompressed_size", declared_size, max_size)?;

    let mut decoder = zstd::Decoder::new(reader.remaining())
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    let mut decompressed = Vec::with_capacity(declared_size);
    decoder
        .by_ref()
        .take(declared_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    if decompressed.len() != declared_size {
        return Err(DecodeError::UncompressedSizeMismatch {
            declared: declared_size,
            actual: decompressed.len(),
        });
    }
    Ok(decompressed)
}

fn decode_meta(fields: &Fields<'_>) -> Result<Meta, DecodeError> {
    let mut object: Object = fields
        .opt_object("meta")?
        .cloned()
        .ok_or_else(|| DecodeError::missing("meta"))?;
    let version = Fields::new(&object, "meta").u32("version")?;
    migration::upgrade(&mut object, version, migration::META, "meta")?;

    let meta = Fields::new(&object, "meta");
    let compatibility_version = meta.u32("compatibilityVersion")?;
    if compatibility_version > CURRENT_VERSION || version < MIN_SUPPORTED_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            version,
            compatibility: compatibility_version,
        });
    }
    Ok(Meta {
        version,
        compatibility_version,
        app_version: meta.opt_string("appVersion")?,
        build: meta.opt_string("build")?,
    })
}

fn decode_nodes(
    fields: &Fields<'_>,
    version: u32,
    doc: &mut Document,
    coordinator: &mut Coordinator,
) -> Result<(), DecodeError> {
    for (position, value) in fields.array("nodes")?.iter().enumerate() {
        let decoded = decode_node(value, version, position)?;
        let is_instance = matches!(decoded.node.kind, NodeKind::ComponentInstance(_));
        let links = decoded.links;
        let id = decoded.node.id().to_string();
        // Insertion only fails on a duplicate id.
        let index = doc
            .graph
            .insert(decoded.node)
            .map_err(|_| DecodeError::DuplicateId { id })?;

        coordinator.register_many(
            index,
            ListField::Children,
            links.children,
            Some(Inverse::Set(NodeField::Parent)),
        );
        for (field, target) in [
            (NodeField::Background, links.background),
            (NodeField::Overlay, links.overlay),
            (NodeField::Mask, links.mask),
            (NodeField::ActionTarget, links.action_target),
        ] {
            if let Some(target) = target {
                coordinator.register_one(index, field, target, None);
            }
        }
        if let Some(component) = links.component {
            coordinator.register_one(
                index,
                NodeField::Component,
                component,
                Some(Inverse::Append(ListField::Instances)),
            );
        }
        for (slot, wire) in links.paints {
            match wire {
                FillWire::Color(id) => coordinator.register_color(index, slot, id),
                FillWire::Gradient(id) => coordinator.register_gradient(index, slot, id),
                FillWire::Literal(_) => {}
            }
        }
        if is_instance {
            coordinator.defer(move |doc| prune_overrides(doc, index));
        }
    }
    Ok(())
}

/// Drops instance overrides the main component does not declare.
fn prune_overrides(doc: &mut Document, instance: NodeIndex) {
    let declared: FxHashSet<String> = {
        let Some(NodeKind::ComponentInstance(node)) = doc.graph.get(instance).map(|n| &n.kind) else {
            return;
        };
        let Some(main) = node.component() else {
            return;
        };
        let Some(NodeKind::MainComponent(main)) = doc.graph.get(main).map(|n| &n.kind) else {
            return;
        };
        main.properties.iter().map(|(name, _)| name.to_string()).collect()
    };

    let Some(node) = doc.graph.get_mut(instance) else {
        return;
    };
    let id = node.id().clone();
    if let NodeKind::ComponentInstance(component) = &mut node.kind {
        component.overrides.retain(|name, _| {
            let keep = declared.contains(name);
            if !keep {
                log::debug!("{id}: dropping override {name:?} not declared by its component");
            }
            keep
        });
    }
}

fn decode_resources(fields: &Fields<'_>, doc: &mut Document) -> Result<(), DecodeError> {
    doc.colors = each(fields, "colors", |color| {
        Ok(DocumentColor {
            id: color.string("id").map(ResourceId::new)?,
            name: color.opt_string("name")?,
            default: decode_color(color.required("default")?, &color.at("default"))?,
            dark: color
                .opt("dark")
                .map(|v| decode_color(v, &color.at("dark")))
                .transpose()?,
        })
    })?;

    doc.gradients = each(fields, "gradients", |gradient| {
        let stops_path = gradient.at("stops");
        Ok(DocumentGradient {
            id: gradient.string("id").map(ResourceId::new)?,
            name: gradient.opt_string("name")?,
            stops: gradient
                .array("stops")?
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let path = index_path(&stops_path, i);
                    let stop = Fields::of(v, &path)?;
                    Ok(GradientStop {
                        color: decode_color(stop.required("color")?, &stop.at("color"))?,
                        location: stop.number("location")?,
                    })
                })
                .collect::<Result<_, DecodeError>>()?,
            start: decode_point(&gradient, "start")?,
            end: decode_point(&gradient, "end")?,
        })
    })?;

    doc.fonts = each(fields, "fonts", |font| {
        Ok(DocumentFont {
            family: font.string("family")?,
            postscript_name: font.string("postscriptName")?,
            asset: font.string("asset")?,
        })
    })?;

    doc.appearance = fields.enum_or_default("appearance", "appearance")?;

    doc.url_parameters = each(fields, "urlParameters", |parameter| {
        Ok(UrlParameter {
            key: parameter.string("key")?,
            value: parameter.string("value")?,
        })
    })?;

    doc.user_info = fields.opt_object("userInfo")?.cloned().unwrap_or_default();

    doc.authorizers = each(fields, "authorizers", |authorizer| {
        Ok(Authorizer {
            pattern: authorizer.string("pattern")?,
            method: authorizer
                .opt("method")
                .map(|v| {
                    serde_json::from_value::<HttpMethod>(v.clone())
                        .map_err(|_| DecodeError::invalid(authorizer.at("method"), "HTTP method"))
                })
                .transpose()?,
            key: authorizer.string("key")?,
            value: authorizer.string("value")?,
        })
    })?;

    doc.localizations = match fields.opt("localizations") {
        None => BTreeMap::new(),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|_| DecodeError::invalid("localizations", "locale → key → text"))?,
    };
    Ok(())
}

/// Decodes every object of the array at `key` with `decode`.
fn each<T>(
    fields: &Fields<'_>,
    key: &str,
    mut decode: impl FnMut(Fields<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let path = fields.at(key);
    fields
        .array(key)?
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let element_path = index_path(&path, i);
            decode(Fields::of(value, &element_path)?)
        })
        .collect()
}

fn decode_point(fields: &Fields<'_>, key: &str) -> Result<Point, DecodeError> {
    let path = fields.at(key);
    let point = Fields::of(fields.required(key)?, &path)?;
    Ok(Point {
        x: point.number("x")?,
        y: point.number("y")?,
    })
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a document as JSON in the current layout.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>, EncodeError> {
    encode_document_with_options(doc, &EncodeOptions::default())
}

/// Encodes a document as JSON with options.
///
/// Only nodes reachable from a screen are written, in arena order. A segue
/// whose endpoints are unresolved or unwritten is skipped.
pub fn encode_document_with_options(doc: &Document, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let value = encode_document_value(doc, options)?;
    let result = if options.pretty {
        serde_json::to_vec_pretty(&value)
    } else {
        serde_json::to_vec(&value)
    };
    result.map_err(|e| EncodeError::Serialization {
        path: "document".to_string(),
        message: e.to_string(),
    })
}

/// Encodes a document with zstd compression.
pub fn encode_document_compressed(doc: &Document, level: i32) -> Result<Vec<u8>, EncodeError> {
    encode_document_compressed_with_options(doc, level, &EncodeOptions::default())
}

/// Encodes a document with zstd compression and options.
pub fn encode_document_compressed_with_options(
    doc: &Document,
    level: i32,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let uncompressed = encode_document_with_options(doc, options)?;

    let compressed = zstd::encode_all(uncompressed.as_slice(), level)
        .map_err(|e| EncodeError::CompressionFailed(e.to_string()))?;

    let mut writer = Writer::with_capacity(MAGIC_COMPRESSED.len() + 10 + compressed.len());
    writer.write_bytes(MAGIC_COMPRESSED);
    writer.write_varint(uncompressed.len() as u64);
    writer.write_bytes(&compressed);

    Ok(writer.into_bytes())
}

fn encode_document_value(doc: &Document, options: &EncodeOptions) -> Result<Value, EncodeError> {
    let written = doc.reachable_nodes();
    let ctx = EncodeContext::new(doc, written.iter().copied());
    let mut out = ObjectWriter::new("");

    let mut meta = Map::new();
    meta.insert("version".into(), CURRENT_VERSION.into());
    meta.insert("compatibilityVersion".into(), CURRENT_VERSION.into());
    let app_version = options.app_version.as_ref().or(doc.meta.app_version.as_ref());
    if let Some(app_version) = app_version {
        meta.insert("appVersion".into(), app_version.as_str().into());
    }
    if let Some(build) = options.build.as_ref().or(doc.meta.build.as_ref()) {
        meta.insert("build".into(), build.as_str().into());
    }
    out.put("meta", meta);

    let nodes = written
        .iter()
        .filter_map(|index| doc.graph.get(*index))
        .map(|node| encode_node(node, &ctx))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("encoding {} of {} node(s)", nodes.len(), doc.graph.len());
    out.put("nodes", nodes);

    out.put(
        "screenIDs",
        doc.screens
            .iter()
            .filter_map(|screen| ctx.node_id(*screen))
            .map(|id| Value::from(id.as_str()))
            .collect::<Vec<_>>(),
    );
    out.put_opt(
        "initialScreenID",
        doc.initial_screen.and_then(|s| ctx.node_id(s)).map(|id| id.as_str()),
    );

    let mut segues = Vec::with_capacity(doc.segues.len());
    for (i, segue) in doc.segues.iter().enumerate() {
        let source = segue.source.and_then(|s| ctx.node_id(s));
        let destination = segue.destination.and_then(|d| ctx.node_id(d));
        let (Some(source), Some(destination)) = (source, destination) else {
            log::warn!("skipping segue {i}: endpoint is not a written screen");
            continue;
        };
        segues.push(json!({
            "sourceID": source.as_str(),
            "destinationID": destination.as_str(),
            "style": to_wire(|| format!("segues[{i}].style"), &segue.style)?,
        }));
    }
    out.put("segues", segues);

    let colors = doc
        .colors
        .iter()
        .enumerate()
        .map(|(i, color)| {
            let path = index_path("colors", i);
            let mut entry = ObjectWriter::new(&path);
            entry.put("id", color.id.as_str());
            entry.put_opt("name", color.name.clone());
            entry.put("default", encode_color(&color.default, &entry.at("default"))?);
            if let Some(dark) = &color.dark {
                entry.put("dark", encode_color(dark, &entry.at("dark"))?);
            }
            Ok(entry.into_value())
        })
        .collect::<Result<Vec<_>, EncodeError>>()?;
    out.put("colors", colors);

    let gradients = doc
        .gradients
        .iter()
        .enumerate()
        .map(|(i, gradient)| encode_gradient(gradient, &index_path("gradients", i)))
        .collect::<Result<Vec<_>, _>>()?;
    out.put("gradients", gradients);

    out.put(
        "fonts",
        doc.fonts
            .iter()
            .map(|font| {
                json!({
                    "family": font.family,
                    "postscriptName": font.postscript_name,
                    "asset": font.asset,
                })
            })
            .collect::<Vec<_>>(),
    );
    out.wire("appearance", &doc.appearance)?;
    out.put(
        "urlParameters",
        doc.url_parameters
            .iter()
            .map(|p| json!({"key": p.key, "value": p.value}))
            .collect::<Vec<_>>(),
    );
    out.put("userInfo", doc.user_info.clone());

    let mut authorizers = Vec::with_capacity(doc.authorizers.len());
    for (i, authorizer) in doc.authorizers.iter().enumerate() {
        let path = index_path("authorizers", i);
        let mut entry = ObjectWriter::new(&path);
        entry.put("pattern", authorizer.pattern.as_str());
        if let Some(method) = &authorizer.method {
            entry.wire("method", method)?;
        }
        entry.put("key", authorizer.key.as_str());
        entry.put("value", authorizer.value.as_str());
        authorizers.push(entry.into_value());
    }
    out.put("authorizers", authorizers);
    out.wire("localizations", &doc.localizations)?;

    Ok(out.into_value())
}

fn encode_gradient(gradient: &DocumentGradient, path: &str) -> Result<Value, EncodeError> {
    let mut out = ObjectWriter::new(path);
    out.put("id", gradient.id.as_str());
    out.put_opt("name", gradient.name.clone());
    let stops_path = out.at("stops");
    let stops = gradient
        .stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let path = index_path(&stops_path, i);
            let mut entry = ObjectWriter::new(&path);
            entry.put("color", encode_color(&stop.color, &entry.at("color"))?);
            entry.number("location", stop.location)?;
            Ok(entry.into_value())
        })
        .collect::<Result<Vec<_>, EncodeError>>()?;
    out.put("stops", stops);
    for (key, point) in [("start", gradient.start), ("end", gradient.end)] {
        let path = out.at(key);
        let mut entry = ObjectWriter::new(&path);
        entry.number("x", point.x)?;
        entry.number("y", point.y)?;
        out.put(key, entry.into_value());
    }
    Ok(out.into_value())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::binding::{Binding, Properties, Variable};
    use crate::error::{ErrorCode, ResolveError};
    use crate::model::{
        Action, Appearance, Color, DocumentBuilder, Fill, Id, Insets,
        LineLimit, MainComponent, NodeBuilder, Rectangle, Screen, SegueStyle, Stack, Text,
    };
    use crate::query::{Collection, Condition, Limit, Predicate, Scalar, SortDescriptor};
    use crate::resolve::IntegrityFault;

    fn to_bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn sample_document() -> Document {
        let mut builder = DocumentBuilder::new()
            .app_version("2.4.0")
            .appearance(Appearance::Dark)
            .color(DocumentColor {
                name: Some("Brand".into()),
                dark: Some(Color::rgb(0.1, 0.1, 0.3)),
                ..DocumentColor::new(Color::rgb(0.2, 0.4, 0.8))
            })
            .screen("Home", |screen| {
                screen.child(
                    NodeBuilder::new(Stack::default())
                        .padding(Insets::uniform(16.0))
                        .child(NodeBuilder::new(Text::new("Welcome")).name("Title"))
                        .child(
                            NodeBuilder::new(Collection {
                                key_path: "data.items".into(),
                                filters: vec![Condition {
                                    key_path: "n".into(),
                                    predicate: Predicate::IsGreaterThan,
                                    value: Some(Scalar::Number(1.0)),
                                }],
                                sort_descriptors: vec![SortDescriptor::descending("n")],
                                limit: Some(Limit::new(5, 2)),
                            })
                            .child(NodeBuilder::new(Text {
                                text: Variable::bound(String::new(), Binding::KeyPath("n".into())),
                                ..Text::default()
                            })),
                        ),
                )
            })
            .screen("Detail", |screen| {
                screen.child(NodeBuilder::new(Text::new("Back")).action(Action::Dismiss))
            })
            .segue(0, 1, SegueStyle::Push);
        builder = builder.font(DocumentFont {
            family: "Inter".into(),
            postscript_name: "Inter-Regular".into(),
            asset: "inter.ttf".into(),
        });
        let mut doc = builder.build();

        let text = doc
            .graph
            .iter()
            .find(|(_, node)| node.name.as_deref() == Some("Title"))
            .map(|(index, _)| index)
            .unwrap();
        if let NodeKind::Text(text) = &mut doc.graph.get_mut(text).unwrap().kind {
            text.color = Some(Fill::Swatch(crate::model::ColorIndex(0)));
        }
        doc.localizations
            .entry("en".into())
            .or_default()
            .insert("welcome".into(), "Welcome".into());
        doc
    }

    #[test]
    fn test_round_trip() {
        let doc = sample_document();
        let bytes = encode_document(&doc).unwrap();
        let decoded = decode_document(&bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_compressed_round_trip() {
        let doc = sample_document();
        let compressed = encode_document_compressed(&doc, 3).unwrap();
        assert!(compressed.starts_with(MAGIC_COMPRESSED));
        assert_eq!(decode_document(&compressed).unwrap(), doc);
    }

    #[test]
    fn test_encode_writes_current_header() {
        let mut doc = sample_document();
        doc.meta.version = 7;
        let options = EncodeOptions {
            build: Some("512".into()),
            ..EncodeOptions::pretty()
        };
        let bytes = encode_document_with_options(&doc, &options).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["meta"]["version"], CURRENT_VERSION);
        assert_eq!(value["meta"]["compatibilityVersion"], CURRENT_VERSION);
        assert_eq!(value["meta"]["appVersion"], "2.4.0");
        assert_eq!(value["meta"]["build"], "512");
    }

    #[test]
    fn test_detached_nodes_are_not_written() {
        let mut doc = sample_document();
        let orphan = doc.graph.create(Text::new("orphan"));
        let orphan_id = doc.graph.get(orphan).unwrap().id().clone();
        let bytes = encode_document(&doc).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let ids: Vec<&str> = value["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap())
            .collect();
        assert!(!ids.contains(&orphan_id.as_str()));
    }

    #[test]
    fn test_segue_to_unwritten_screen_is_skipped() {
        let mut doc = sample_document();
        let loose = doc.graph.create(Screen::default());
        doc.segues.push(Segue {
            source: doc.screens.first().copied(),
            destination: Some(loose),
            style: SegueStyle::Modal,
        });
        let bytes = encode_document(&doc).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["segues"].as_array().unwrap().len(), 1);
    }

    fn version_two_document() -> Value {
        json!({
            "meta": {"version": 2},
            "nodes": [
                {"__typeName": "Screen", "id": "S1", "childIDs": ["ST"], "paddingTop": 20},
                {"__typeName": "Stack", "id": "ST", "childIDs": ["T1", "C1"]},
                {"__typeName": "Text", "id": "T1", "text": "Hello", "numberOfLines": 3},
                {
                    "__typeName": "Collection",
                    "id": "C1",
                    "dataKey": "items",
                    "filters": [{"keyPath": "n", "predicate": "equals", "value": 2}],
                    "limit": {"count": 3}
                }
            ],
            "screenIDs": ["S1"]
        })
    }

    #[test]
    fn test_version_two_document() {
        let doc = decode_document(&to_bytes(version_two_document())).unwrap();
        assert_eq!(doc.meta.version, 2);
        assert_eq!(doc.meta.compatibility_version, 2);

        let screen = doc.graph.lookup(&Id::new("S1")).unwrap();
        assert_eq!(doc.initial_screen, Some(screen));
        assert_eq!(
            doc.graph.get(screen).unwrap().facets.padding,
            Some(Insets {
                top: 20.0,
                ..Insets::default()
            })
        );

        let text = doc.graph.lookup(&Id::new("T1")).unwrap();
        let NodeKind::Text(payload) = &doc.graph.get(text).unwrap().kind else {
            panic!("expected text");
        };
        assert_eq!(payload.text.constant, "Hello");
        assert_eq!(payload.line_limit, LineLimit { min: None, max: Some(3) });
        assert_eq!(doc.screen_of(text), Some(screen));

        let collection = doc.graph.lookup(&Id::new("C1")).unwrap();
        let NodeKind::Collection(payload) = &doc.graph.get(collection).unwrap().kind else {
            panic!("expected collection");
        };
        assert_eq!(payload.key_path, "data.items");
        assert_eq!(payload.filters[0].value, Some(Scalar::Number(2.0)));
        assert_eq!(payload.limit, Some(Limit::new(3, 1)));
    }

    #[test]
    fn test_version_five_instance_keeps_legacy_key() {
        // At v5 componentID is current; a stray mainComponentID is ignored.
        let value = json!({
            "meta": {"version": 5, "compatibilityVersion": 5},
            "nodes": [
                {"__typeName": "Screen", "id": "S1", "childIDs": ["M1", "I1"]},
                {
                    "__typeName": "MainComponent",
                    "id": "M1",
                    "properties": {"title": {"type": "text", "value": "Default"}}
                },
                {
                    "__typeName": "ComponentInstance",
                    "id": "I1",
                    "mainComponentID": "M1",
                    "overrides": {"title": {"type": "text", "value": "Custom"}}
                }
            ],
            "screenIDs": ["S1"]
        });
        let doc = decode_document(&to_bytes(value)).unwrap();
        let instance = doc.graph.lookup(&Id::new("I1")).unwrap();
        let NodeKind::ComponentInstance(payload) = &doc.graph.get(instance).unwrap().kind else {
            panic!("expected instance");
        };
        assert_eq!(payload.component(), None);
    }

    #[test]
    fn test_instance_links_and_override_pruning() {
        let value = json!({
            "meta": {"version": 4},
            "nodes": [
                {"__typeName": "Screen", "id": "S1", "childIDs": ["M1", "I1"]},
                {
                    "__typeName": "MainComponent",
                    "id": "M1",
                    "properties": {"title": {"type": "text", "value": "Default"}}
                },
                {
                    "__typeName": "ComponentInstance",
                    "id": "I1",
                    "mainComponentID": "M1",
                    "overrides": {
                        "title": {"type": "text", "value": "Custom"},
                        "stale": {"type": "number", "value": 3}
                    }
                }
            ],
            "screenIDs": ["S1"]
        });
        let doc = decode_document(&to_bytes(value)).unwrap();
        let main = doc.graph.lookup(&Id::new("M1")).unwrap();
        let instance = doc.graph.lookup(&Id::new("I1")).unwrap();

        let NodeKind::MainComponent(component) = &doc.graph.get(main).unwrap().kind else {
            panic!("expected main component");
        };
        assert_eq!(component.instances(), &[instance]);
        let NodeKind::ComponentInstance(payload) = &doc.graph.get(instance).unwrap().kind else {
            panic!("expected instance");
        };
        assert_eq!(payload.component(), Some(main));
        assert_eq!(payload.overrides, Properties::new().with("title", "Custom"));
        assert_eq!(
            payload.effective_properties(component).get("title"),
            Some(&"Custom".into())
        );
    }

    #[test]
    fn test_version_nine_collection_limit() {
        let value = json!({
            "meta": {"version": 9, "compatibilityVersion": 7},
            "nodes": [
                {"__typeName": "Screen", "id": "S1", "childIDs": ["C1"]},
                {
                    "__typeName": "Collection",
                    "id": "C1",
                    "keyPath": "data.items",
                    "filters": [{"keyPath": "n", "predicate": "isSet"}],
                    "sortDescriptors": [{"keyPath": "n", "ascending": false}],
                    "limit": {"count": 10, "offset": 4}
                }
            ],
            "screenIDs": ["S1"]
        });
        let doc = decode_document(&to_bytes(value)).unwrap();
        let collection = doc.graph.lookup(&Id::new("C1")).unwrap();
        let NodeKind::Collection(payload) = &doc.graph.get(collection).unwrap().kind else {
            panic!("expected collection");
        };
        assert_eq!(payload.limit, Some(Limit::new(10, 5)));
        assert_eq!(payload.sort_descriptors, vec![SortDescriptor::descending("n")]);
    }

    #[test]
    fn test_unsupported_versions() {
        let too_new = json!({"meta": {"version": 14, "compatibilityVersion": 12}, "nodes": []});
        let err = decode_document(&to_bytes(too_new)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnsupportedVersion {
                version: 14,
                compatibility: 12
            }
        );
        assert_eq!(err.code(), ErrorCode::UnsupportedVersion);

        let too_old = json!({"meta": {"version": 0}, "nodes": []});
        assert!(matches!(
            decode_document(&to_bytes(too_old)),
            Err(DecodeError::UnsupportedVersion { version: 0, .. })
        ));
    }

    #[test]
    fn test_newer_compatible_version_decodes() {
        let value = json!({
            "meta": {"version": 12, "compatibilityVersion": 10},
            "nodes": [{"__typeName": "Screen", "id": "S1"}],
            "screenIDs": ["S1"]
        });
        let doc = decode_document(&to_bytes(value)).unwrap();
        assert_eq!(doc.meta.version, 12);
        assert_eq!(doc.screens.len(), 1);
    }

    #[test]
    fn test_envelope_errors() {
        assert!(matches!(
            decode_document(b"{not json"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert_eq!(decode_document(b"[]"), Err(DecodeError::RootNotObject));
        assert_eq!(decode_document(b"{}"), Err(DecodeError::missing("meta")));

        let options = DecodeOptions {
            max_document_size: 8,
            ..DecodeOptions::default()
        };
        assert!(matches!(
            decode_document_with_options(b"{\"meta\": {}}", &options),
            Err(DecodeError::LengthExceedsLimit { field: "document", .. })
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let value = json!({
            "meta": {"version": 10, "compatibilityVersion": 10},
            "nodes": [
                {"__typeName": "Screen", "id": "S1"},
                {"__typeName": "Spacer", "id": "S1"}
            ]
        });
        assert_eq!(
            decode_document(&to_bytes(value)),
            Err(DecodeError::DuplicateId { id: "S1".into() })
        );
    }

    fn dangling_document() -> Vec<u8> {
        to_bytes(json!({
            "meta": {"version": 10, "compatibilityVersion": 10},
            "nodes": [
                {"__typeName": "Screen", "id": "S1", "childIDs": ["R1", "GONE"]},
                {
                    "__typeName": "Rectangle",
                    "id": "R1",
                    "maskID": "ALSO_GONE",
                    "fill": {"colorID": "NO_COLOR"},
                    "cornerRadius": 4
                }
            ],
            "screenIDs": ["S1"],
            "initialScreenID": "S1"
        }))
    }

    #[test]
    fn test_dangling_references_soft() {
        let (doc, report) =
            decode_document_with_options(&dangling_document(), &DecodeOptions::default()).unwrap();
        let screen = doc.graph.lookup(&Id::new("S1")).unwrap();
        let rect = doc.graph.lookup(&Id::new("R1")).unwrap();

        assert_eq!(doc.graph.get(screen).unwrap().children(), &[rect]);
        let node = doc.graph.get(rect).unwrap();
        assert_eq!(node.facets.mask, None);
        assert_eq!(
            node.kind,
            NodeKind::Rectangle(Rectangle {
                fill: None,
                corner_radius: 4.0
            })
        );
        assert_eq!(report.faults.len(), 3);
        assert!(matches!(
            &report.faults[2],
            IntegrityFault::MissingResource { field: "fill", .. }
        ));
    }

    #[test]
    fn test_dangling_references_strict() {
        let err = decode_document_with_options(&dangling_document(), &DecodeOptions::strict())
            .unwrap_err();
        let DecodeError::Resolve(ResolveError::IntegrityFaults(faults)) = &err else {
            panic!("expected integrity faults, got {err:?}");
        };
        assert_eq!(faults.len(), 3);
        assert_eq!(err.code(), ErrorCode::IntegrityFault);
    }

    #[test]
    fn test_facet_sub_nodes_survive_round_trip() {
        let value = json!({
            "meta": {"version": 10, "compatibilityVersion": 10},
            "nodes": [
                {"__typeName": "Screen", "id": "S1", "childIDs": ["T1"]},
                {"__typeName": "Text", "id": "T1", "text": {"constant": "hi"}, "backgroundID": "R1"},
                {"__typeName": "Rectangle", "id": "R1", "cornerRadius": 2}
            ],
            "screenIDs": ["S1"]
        });
        let (doc, report) =
            decode_document_with_options(&to_bytes(value), &DecodeOptions::strict()).unwrap();
        assert!(report.is_clean());

        let encoded: Value = serde_json::from_slice(&encode_document(&doc).unwrap()).unwrap();
        let nodes = encoded["nodes"].as_array().unwrap();
        assert!(nodes.iter().any(|n| n["id"] == "R1"));
        let text = nodes.iter().find(|n| n["id"] == "T1").unwrap();
        assert_eq!(text["backgroundID"], "R1");
        assert_eq!(decode_document(&serde_json::to_vec(&encoded).unwrap()).unwrap(), doc);
    }

    fn orphan_document() -> Vec<u8> {
        to_bytes(json!({
            "meta": {"version": 10, "compatibilityVersion": 10},
            "nodes": [
                {"__typeName": "Screen", "id": "S1"},
                {"__typeName": "Spacer", "id": "LOOSE"}
            ],
            "screenIDs": ["S1"]
        }))
    }

    #[test]
    fn test_unreachable_node_is_a_fault() {
        let (_, report) =
            decode_document_with_options(&orphan_document(), &DecodeOptions::default()).unwrap();
        assert_eq!(
            report.faults,
            vec![IntegrityFault::Unreachable {
                node: Id::new("LOOSE")
            }]
        );

        let err = decode_document_with_options(&orphan_document(), &DecodeOptions::strict())
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Resolve(ResolveError::IntegrityFaults(ref faults)) if faults.len() == 1
        ));
    }

    #[test]
    fn test_duplicate_screen_id_listed_once() {
        let value = json!({
            "meta": {"version": 10, "compatibilityVersion": 10},
            "nodes": [{"__typeName": "Screen", "id": "S1"}],
            "screenIDs": ["S1", "S1"]
        });
        let (doc, report) =
            decode_document_with_options(&to_bytes(value), &DecodeOptions::default()).unwrap();
        assert_eq!(doc.screens.len(), 1);
        assert_eq!(
            report.faults,
            vec![IntegrityFault::DuplicateScreen {
                screen: Id::new("S1")
            }]
        );
    }

    #[test]
    fn test_truncated_compressed_input() {
        let doc = sample_document();
        let mut compressed = encode_document_compressed(&doc, 3).unwrap();
        compressed.truncate(compressed.len() / 2);
        let err = decode_document(&compressed).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DecompressionFailed(_) | DecodeError::UncompressedSizeMismatch { .. }
        ));
    }

    #[test]
    fn test_declared_size_over_limit() {
        let mut writer = Writer::default();
        writer.write_bytes(MAGIC_COMPRESSED);
        writer.write_varint(1 << 40);
        assert!(matches!(
            decode_document(&writer.into_bytes()),
            Err(DecodeError::LengthExceedsLimit {
                field: "uncompressed_size",
                ..
            })
        ));
    }

    #[test]
    fn test_instance_round_trip() {
        let mut doc = Document::new();
        let screen = doc.add_screen(Screen::default());
        let main = doc
            .graph
            .create(MainComponent::new(Properties::new().with("title", "Default")));
        doc.graph.attach(screen, main, None).unwrap();
        let instance = doc.graph.instantiate(main).unwrap();
        doc.graph.attach(screen, instance, None).unwrap();
        if let NodeKind::ComponentInstance(payload) = &mut doc.graph.get_mut(instance).unwrap().kind {
            payload.overrides = Properties::new().with("title", "Custom");
        }

        let decoded = decode_document(&encode_document(&doc).unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }
}
