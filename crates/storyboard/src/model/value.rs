//! Value types carried by nodes and facets.
//!
//! Plain enums serialize through serde with their wire names; structs that
//! hold numbers are encoded by the codec so non-finite values can be
//! rejected with a field path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::binding::Variable;
use crate::model::NodeIndex;

/// RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Color::rgba(red, green, blue, 1.0)
    }

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// Position of a color in [`Document::colors`](crate::model::Document::colors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorIndex(pub u32);

/// Position of a gradient in [`Document::gradients`](crate::model::Document::gradients).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GradientIndex(pub u32);

/// Paint for text, shapes and shadows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// Literal color.
    Color(Color),
    /// Document color; follows the document appearance.
    Swatch(ColorIndex),
    /// Document gradient.
    Gradient(GradientIndex),
}

impl From<Color> for Fill {
    fn from(color: Color) -> Self {
        Fill::Color(color)
    }
}

/// Edge insets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: f64,
    pub leading: f64,
    pub bottom: f64,
    pub trailing: f64,
}

impl Insets {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            leading: value,
            bottom: value,
            trailing: value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.leading == 0.0 && self.bottom == 0.0 && self.trailing == 0.0
    }
}

/// Size constraints. Unset dimensions are left to layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
}

impl Frame {
    pub fn fixed(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Frame::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub fill: Option<Fill>,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            fill: Some(Fill::Color(Color::rgba(0.0, 0.0, 0.0, 0.33))),
            x: 0.0,
            y: 0.0,
            radius: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Horizontal,
    #[default]
    Vertical,
    /// Children drawn on top of one another.
    Depth,
}

/// Cross-axis alignment of stack children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    Leading,
    #[default]
    Center,
    Trailing,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlignment {
    #[default]
    Leading,
    Center,
    Trailing,
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontWeight {
    Ultralight,
    Thin,
    Light,
    #[default]
    Regular,
    Medium,
    Semibold,
    Bold,
    Heavy,
    Black,
}

/// Font selection for a text node. A `family` of `None` uses the system
/// font; other families are looked up in [`Document::fonts`](crate::model::Document::fonts).
#[derive(Debug, Clone, PartialEq)]
pub struct FontStyle {
    pub family: Option<String>,
    pub size: f64,
    pub weight: FontWeight,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            family: None,
            size: 17.0,
            weight: FontWeight::Regular,
        }
    }
}

/// Bounds on the number of lines a text node shows. `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineLimit {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl LineLimit {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn at_most(max: u32) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizingMode {
    #[default]
    ScaleToFit,
    ScaleToFill,
    Stretch,
    Original,
}

/// What happens when a node is tapped.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Close the presenting context.
    Close,
    /// Dismiss the current modal screen.
    Dismiss,
    /// Navigate to a screen. `None` when the target did not resolve.
    NavigateTo { screen: Option<NodeIndex> },
    OpenUrl { url: Variable<String> },
    /// Host-defined action.
    Custom { identifier: String },
}

impl Action {
    /// Wire name of the action kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Close => "close",
            Action::Dismiss => "dismiss",
            Action::NavigateTo { .. } => "navigate",
            Action::OpenUrl { .. } => "openURL",
            Action::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessibility {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// Free-form annotations. Never interpreted by the crate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.properties.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Presentation style of a segue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegueStyle {
    #[default]
    Push,
    Modal,
    Sheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Appearance {
    #[default]
    Auto,
    Light,
    Dark,
}
