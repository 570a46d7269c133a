//! Builder API for ergonomic document construction.
//!
//! # Example
//!
//! ```rust
//! use storyboard::model::builder::{DocumentBuilder, NodeBuilder};
//! use storyboard::model::{Insets, SegueStyle, Stack, Text};
//!
//! let doc = DocumentBuilder::new()
//!     .app_version("2.4.0")
//!     .screen("Home", |s| s
//!         .child(NodeBuilder::new(Stack::default())
//!             .padding(Insets::uniform(16.0))
//!             .child(NodeBuilder::new(Text::new("Hello")).name("Greeting"))
//!         )
//!     )
//!     .screen("Details", |s| s)
//!     .segue(0, 1, SegueStyle::Push)
//!     .build();
//!
//! assert_eq!(doc.screens.len(), 2);
//! assert_eq!(doc.reachable_nodes().len(), 4);
//! ```

use crate::model::document::{Document, DocumentColor, DocumentFont, Segue};
use crate::model::graph::{NodeGraph, NodeIndex};
use crate::model::node::{Facets, NodeKind, Screen};
use crate::model::value::{
    Accessibility, Action, Appearance, Frame, Insets, Metadata, SegueStyle, Shadow,
};

/// Builder for a [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: Document,
    segues: Vec<(usize, usize, SegueStyle)>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.doc.meta.app_version = Some(version.into());
        self
    }

    pub fn build_number(mut self, build: impl Into<String>) -> Self {
        self.doc.meta.build = Some(build.into());
        self
    }

    pub fn appearance(mut self, appearance: Appearance) -> Self {
        self.doc.appearance = appearance;
        self
    }

    pub fn color(mut self, color: DocumentColor) -> Self {
        self.doc.colors.push(color);
        self
    }

    pub fn font(mut self, font: DocumentFont) -> Self {
        self.doc.fonts.push(font);
        self
    }

    /// Adds a screen. The first screen becomes the initial screen.
    pub fn screen<F>(mut self, title: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(NodeBuilder) -> NodeBuilder,
    {
        let builder = f(NodeBuilder::new(Screen {
            title: Some(title.into()),
        }));
        let index = builder.materialize(&mut self.doc.graph);
        self.doc.screens.push(index);
        if self.doc.initial_screen.is_none() {
            self.doc.initial_screen = Some(index);
        }
        self
    }

    /// Adds a segue between two screens, given by their position in the
    /// order they were added. Positions with no screen leave the endpoint
    /// unset.
    pub fn segue(mut self, source: usize, destination: usize, style: SegueStyle) -> Self {
        self.segues.push((source, destination, style));
        self
    }

    pub fn build(mut self) -> Document {
        for (source, destination, style) in self.segues {
            let segue = Segue {
                source: self.doc.screens.get(source).copied(),
                destination: self.doc.screens.get(destination).copied(),
                style,
            };
            self.doc.segues.push(segue);
        }
        self.doc
    }
}

/// Builder for a node and its subtree.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    name: Option<String>,
    facets: Facets,
    kind: NodeKind,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    pub fn new(kind: impl Into<NodeKind>) -> Self {
        Self {
            name: None,
            facets: Facets::default(),
            kind: kind.into(),
            children: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn padding(mut self, padding: Insets) -> Self {
        self.facets.padding = Some(padding);
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.facets.frame = Some(frame);
        self
    }

    pub fn shadow(mut self, shadow: Shadow) -> Self {
        self.facets.shadow = Some(shadow);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.facets.opacity = Some(opacity);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.facets.action = Some(action);
        self
    }

    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.facets.accessibility = Some(accessibility);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.facets.metadata = Some(metadata);
        self
    }

    /// Appends a child.
    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several children in order.
    pub fn children(mut self, children: impl IntoIterator<Item = NodeBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    /// Creates the subtree in `graph` and returns its detached root.
    pub fn materialize(self, graph: &mut NodeGraph) -> NodeIndex {
        let index = graph.create(self.kind);
        if let Some(node) = graph.get_mut(index) {
            node.name = self.name;
            node.facets = self.facets;
        }
        for child in self.children {
            let child_index = child.materialize(graph);
            graph.adopt(index, child_index);
        }
        index
    }
}
