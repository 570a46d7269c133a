//! The document: node graph, screens and top-level resource tables.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

use crate::limits::CURRENT_VERSION;
use crate::model::graph::{NodeGraph, NodeIndex};
use crate::model::node::Screen;
use crate::model::value::{Appearance, Color, ColorIndex, GradientIndex, HttpMethod, SegueStyle};
use crate::model::ResourceId;

/// Format header.
///
/// `version` selects every decode branch; `compatibility_version` is the
/// oldest reader version able to load the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    pub version: u32,
    pub compatibility_version: u32,
    pub app_version: Option<String>,
    pub build: Option<String>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            compatibility_version: CURRENT_VERSION,
            app_version: None,
            build: None,
        }
    }
}

/// Transition between two screens. Endpoints are `None` when they did not
/// resolve; such segues are not encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segue {
    pub source: Option<NodeIndex>,
    pub destination: Option<NodeIndex>,
    pub style: SegueStyle,
}

/// Named color with an optional dark-appearance variant.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentColor {
    pub id: ResourceId,
    pub name: Option<String>,
    pub default: Color,
    pub dark: Option<Color>,
}

impl DocumentColor {
    pub fn new(default: Color) -> Self {
        Self {
            id: ResourceId::mint(),
            name: None,
            default,
            dark: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub color: Color,
    /// Position along the gradient, `0.0..=1.0`.
    pub location: f64,
}

/// Unit-space point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGradient {
    pub id: ResourceId,
    pub name: Option<String>,
    pub stops: Vec<GradientStop>,
    pub start: Point,
    pub end: Point,
}

/// A custom font shipped with the document. `asset` names the font file in
/// the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFont {
    pub family: String,
    pub postscript_name: String,
    pub asset: String,
}

/// Query parameter appended to every outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParameter {
    pub key: String,
    pub value: String,
}

/// Header attached to requests whose URL starts with `pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorizer {
    pub pattern: String,
    /// `None` matches every method.
    pub method: Option<HttpMethod>,
    pub key: String,
    pub value: String,
}

impl Authorizer {
    pub fn applies_to(&self, url: &str, method: HttpMethod) -> bool {
        url.starts_with(&self.pattern) && self.method.is_none_or(|m| m == method)
    }
}

/// A decoded, fully resolved document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub meta: Meta,
    pub graph: NodeGraph,
    pub screens: Vec<NodeIndex>,
    pub initial_screen: Option<NodeIndex>,
    pub segues: Vec<Segue>,
    pub colors: Vec<DocumentColor>,
    pub gradients: Vec<DocumentGradient>,
    pub fonts: Vec<DocumentFont>,
    pub appearance: Appearance,
    pub url_parameters: Vec<UrlParameter>,
    pub user_info: Map<String, Value>,
    pub authorizers: Vec<Authorizer>,
    /// locale → key → text.
    pub localizations: BTreeMap<String, BTreeMap<String, String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a screen and appends it to the screen list. The first screen
    /// added becomes the initial screen.
    pub fn add_screen(&mut self, screen: Screen) -> NodeIndex {
        let index = self.graph.create(screen);
        self.screens.push(index);
        if self.initial_screen.is_none() {
            self.initial_screen = Some(index);
        }
        index
    }

    pub fn add_color(&mut self, color: DocumentColor) -> ColorIndex {
        self.colors.push(color);
        ColorIndex(self.colors.len() as u32 - 1)
    }

    pub fn add_gradient(&mut self, gradient: DocumentGradient) -> GradientIndex {
        self.gradients.push(gradient);
        GradientIndex(self.gradients.len() as u32 - 1)
    }

    /// Nodes reachable from any screen, in arena order.
    ///
    /// A node's background, overlay and mask are sub-nodes of it and are
    /// reached along with its children.
    pub fn reachable_nodes(&self) -> Vec<NodeIndex> {
        let mut reachable = FxHashSet::default();
        let mut stack = self.screens.clone();
        while let Some(index) = stack.pop() {
            let Some(node) = self.graph.get(index) else {
                continue;
            };
            if !reachable.insert(index) {
                continue;
            }
            stack.extend_from_slice(node.children());
            stack.extend(
                [node.facets.background, node.facets.overlay, node.facets.mask]
                    .into_iter()
                    .flatten(),
            );
        }
        self.graph
            .iter()
            .map(|(index, _)| index)
            .filter(|index| reachable.contains(index))
            .collect()
    }

    /// The screen whose subtree contains `node`.
    pub fn screen_of(&self, node: NodeIndex) -> Option<NodeIndex> {
        let root = self.graph.ancestors(node).last().unwrap_or(node);
        self.screens.contains(&root).then_some(root)
    }

    /// Color at `index` for `appearance`. `Auto` defers to the document's
    /// appearance, and an automatic document uses the light variant.
    pub fn color(&self, index: ColorIndex, appearance: Appearance) -> Option<Color> {
        let color = self.colors.get(index.0 as usize)?;
        let appearance = match appearance {
            Appearance::Auto => self.appearance,
            other => other,
        };
        match appearance {
            Appearance::Dark => Some(color.dark.unwrap_or(color.default)),
            Appearance::Light | Appearance::Auto => Some(color.default),
        }
    }

    pub fn gradient(&self, index: GradientIndex) -> Option<&DocumentGradient> {
        self.gradients.get(index.0 as usize)
    }

    pub fn font(&self, family: &str) -> Option<&DocumentFont> {
        self.fonts.iter().find(|font| font.family == family)
    }

    /// Localized text for `key`. Falls back from a regional locale
    /// (`en-US`) to its language (`en`).
    pub fn localized(&self, locale: &str, key: &str) -> Option<&str> {
        let exact = self.localizations.get(locale).and_then(|table| table.get(key));
        exact
            .or_else(|| {
                let (language, _) = locale.split_once(['-', '_'])?;
                self.localizations.get(language)?.get(key)
            })
            .map(String::as_str)
    }

    /// Authorization headers for a request, in declaration order.
    pub fn authorizers_for<'a>(
        &'a self,
        url: &'a str,
        method: HttpMethod,
    ) -> impl Iterator<Item = &'a Authorizer> + 'a {
        self.authorizers
            .iter()
            .filter(move |authorizer| authorizer.applies_to(url, method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{Rectangle, Stack, Text};

    #[test]
    fn test_reachable_nodes_skip_detached() {
        let mut doc = Document::new();
        let screen = doc.add_screen(Screen::default());
        let orphan = doc.graph.create(Text::new("orphan"));
        let child = doc.graph.create(Text::new("child"));
        doc.graph.attach(screen, child, None).unwrap();

        assert_eq!(doc.reachable_nodes(), vec![screen, child]);
        assert_eq!(doc.screen_of(child), Some(screen));
        assert_eq!(doc.screen_of(orphan), None);
        assert_eq!(doc.initial_screen, Some(screen));
    }

    #[test]
    fn test_reachable_nodes_include_facet_sub_nodes() {
        let mut doc = Document::new();
        let screen = doc.add_screen(Screen::default());
        let text = doc.graph.create(Text::new("label"));
        doc.graph.attach(screen, text, None).unwrap();
        let background = doc.graph.create(Rectangle::default());
        let mask_child = doc.graph.create(Text::new("inner"));
        let mask = doc.graph.create(Stack::default());
        doc.graph.attach(mask, mask_child, None).unwrap();
        let node = doc.graph.get_mut(text).unwrap();
        node.facets.background = Some(background);
        node.facets.mask = Some(mask);

        assert_eq!(
            doc.reachable_nodes(),
            vec![screen, text, background, mask_child, mask]
        );
    }

    #[test]
    fn test_color_follows_appearance() {
        let mut doc = Document::new();
        let index = doc.add_color(DocumentColor {
            dark: Some(Color::WHITE),
            ..DocumentColor::new(Color::BLACK)
        });

        assert_eq!(doc.color(index, Appearance::Light), Some(Color::BLACK));
        assert_eq!(doc.color(index, Appearance::Dark), Some(Color::WHITE));
        assert_eq!(doc.color(index, Appearance::Auto), Some(Color::BLACK));

        doc.appearance = Appearance::Dark;
        assert_eq!(doc.color(index, Appearance::Auto), Some(Color::WHITE));
        assert_eq!(doc.color(ColorIndex(7), Appearance::Auto), None);
    }

    #[test]
    fn test_localized_falls_back_to_language() {
        let mut doc = Document::new();
        doc.localizations
            .entry("en".to_string())
            .or_default()
            .insert("greeting".to_string(), "Hello".to_string());

        assert_eq!(doc.localized("en-US", "greeting"), Some("Hello"));
        assert_eq!(doc.localized("en", "greeting"), Some("Hello"));
        assert_eq!(doc.localized("fr", "greeting"), None);
    }

    #[test]
    fn test_authorizers_match_prefix_and_method() {
        let mut doc = Document::new();
        doc.authorizers.push(Authorizer {
            pattern: "https://api.example.com/".to_string(),
            method: Some(HttpMethod::Get),
            key: "Authorization".to_string(),
            value: "Bearer token".to_string(),
        });

        assert_eq!(
            doc.authorizers_for("https://api.example.com/items", HttpMethod::Get).count(),
            1
        );
        assert_eq!(
            doc.authorizers_for("https://api.example.com/items", HttpMethod::Post).count(),
            0
        );
        assert_eq!(doc.authorizers_for("https://other.com/", HttpMethod::Get).count(), 0);
    }
}
