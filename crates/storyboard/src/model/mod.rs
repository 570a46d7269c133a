//! Data model types for storyboard documents.
//!
//! This module contains the in-memory representation of a document:
//! - Identifiers (node and resource ids)
//! - Nodes, their shared facets and kind-specific payloads
//! - The node arena and its tree operations
//! - The document with its screens and resource tables
//! - Builders (ergonomic construction)

pub mod builder;
pub mod document;
pub mod graph;
pub mod id;
pub mod node;
pub mod value;

pub use builder::{DocumentBuilder, NodeBuilder};
pub use document::{
    Authorizer, Document, DocumentColor, DocumentFont, DocumentGradient, GradientStop, Meta,
    Point, Segue, UrlParameter,
};
pub use graph::{NodeGraph, NodeIndex, PaintOrder};
pub use id::{Id, ResourceId};
pub use node::{
    ComponentInstance, DataSource, Facets, Header, Image, MainComponent, Node, NodeKind,
    Rectangle, Screen, Stack, Text,
};
pub use value::{
    Accessibility, Action, Alignment, Appearance, Axis, Color, ColorIndex, Fill, FontStyle,
    FontWeight, Frame, GradientIndex, HttpMethod, Insets, LineLimit, Metadata, ResizingMode,
    SegueStyle, Shadow, TextAlignment,
};
