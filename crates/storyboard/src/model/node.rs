//! Nodes: identity, tree links, shared facets and the kind-specific payload.

use crate::binding::{AssetRef, Properties, Variable};
use crate::model::value::{
    Accessibility, Action, Alignment, Axis, Fill, FontStyle, Frame, HttpMethod, Insets, LineLimit,
    Metadata, ResizingMode, Shadow, TextAlignment,
};
use crate::model::{Id, NodeIndex};
use crate::query::{Collection, Conditional};

/// An element of the document tree.
///
/// `parent` and `children` are maintained by
/// [`NodeGraph::attach`](crate::model::NodeGraph::attach),
/// [`NodeGraph::detach`](crate::model::NodeGraph::detach) and the decoder;
/// they are read-only from outside the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: Id,
    pub name: Option<String>,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) children: Vec<NodeIndex>,
    pub facets: Facets,
    pub kind: NodeKind,
}

impl Node {
    /// Creates a detached node with the given id.
    pub fn new(id: Id, kind: impl Into<NodeKind>) -> Self {
        Self {
            id,
            name: None,
            parent: None,
            children: Vec::new(),
            facets: Facets::default(),
            kind: kind.into(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// Optional attributes shared by every node kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Facets {
    pub padding: Option<Insets>,
    pub frame: Option<Frame>,
    pub shadow: Option<Shadow>,
    pub opacity: Option<f64>,
    pub background: Option<NodeIndex>,
    pub overlay: Option<NodeIndex>,
    pub mask: Option<NodeIndex>,
    pub action: Option<Action>,
    pub accessibility: Option<Accessibility>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Screen(Screen),
    Stack(Stack),
    Text(Text),
    Image(Image),
    Rectangle(Rectangle),
    Spacer,
    Collection(Collection),
    Conditional(Conditional),
    DataSource(DataSource),
    MainComponent(MainComponent),
    ComponentInstance(ComponentInstance),
}

impl NodeKind {
    /// Wire discriminator (`__typeName`).
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Screen(_) => "Screen",
            NodeKind::Stack(_) => "Stack",
            NodeKind::Text(_) => "Text",
            NodeKind::Image(_) => "Image",
            NodeKind::Rectangle(_) => "Rectangle",
            NodeKind::Spacer => "Spacer",
            NodeKind::Collection(_) => "Collection",
            NodeKind::Conditional(_) => "Conditional",
            NodeKind::DataSource(_) => "DataSource",
            NodeKind::MainComponent(_) => "MainComponent",
            NodeKind::ComponentInstance(_) => "ComponentInstance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Screen {
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stack {
    pub axis: Axis,
    pub spacing: f64,
    pub alignment: Alignment,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    pub text: Variable<String>,
    pub font: FontStyle,
    pub color: Option<Fill>,
    pub alignment: TextAlignment,
    pub line_limit: LineLimit,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Variable::new(text.into()),
            ..Text::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub source: Variable<AssetRef>,
    pub resizing: ResizingMode,
}

impl Image {
    pub fn new(source: AssetRef) -> Self {
        Self {
            source: Variable::new(source),
            resizing: ResizingMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rectangle {
    pub fill: Option<Fill>,
    pub corner_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// Fetches JSON for its subtree. The fetch itself is the host's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub url: Variable<String>,
    pub method: HttpMethod,
    pub headers: Vec<Header>,
    pub body: Option<String>,
    /// Seconds between refreshes; `None` fetches once.
    pub polling_interval: Option<f64>,
}

impl DataSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Variable::new(url.into()),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            polling_interval: None,
        }
    }
}

/// Definition of a reusable component. Declares the properties its
/// instances may override.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MainComponent {
    pub properties: Properties,
    pub(crate) instances: Vec<NodeIndex>,
}

impl MainComponent {
    pub fn new(properties: Properties) -> Self {
        Self {
            properties,
            instances: Vec::new(),
        }
    }

    /// Instances of this component, in registration order.
    pub fn instances(&self) -> &[NodeIndex] {
        &self.instances
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentInstance {
    pub(crate) component: Option<NodeIndex>,
    pub overrides: Properties,
}

impl ComponentInstance {
    /// The main component. `None` when the reference did not resolve.
    pub fn component(&self) -> Option<NodeIndex> {
        self.component
    }

    /// The property table used to resolve bindings inside this instance:
    /// overrides layered over the component's defaults.
    pub fn effective_properties(&self, main: &MainComponent) -> Properties {
        self.overrides.layered_over(&main.properties)
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for NodeKind {
                fn from(value: $variant) -> Self {
                    NodeKind::$variant(value)
                }
            }
        )*
    };
}

impl_from_kind!(
    Screen,
    Stack,
    Text,
    Image,
    Rectangle,
    Collection,
    Conditional,
    DataSource,
    MainComponent,
    ComponentInstance
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_properties_prefer_overrides() {
        let main = MainComponent::new(
            Properties::new().with("title", "Default").with("count", 1.0),
        );
        let instance = ComponentInstance {
            component: None,
            overrides: Properties::new().with("title", "Custom"),
        };

        let effective = instance.effective_properties(&main);
        assert_eq!(effective.get("title"), Some(&"Custom".into()));
        assert_eq!(effective.get("count"), Some(&1.0.into()));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(NodeKind::from(Text::new("hi")).type_name(), "Text");
        assert_eq!(NodeKind::Spacer.type_name(), "Spacer");
        let node = Node::new(Id::new("A"), Screen::default());
        assert_eq!(node.type_name(), "Screen");
        assert!(node.parent().is_none());
    }
}
