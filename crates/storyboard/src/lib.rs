//! Storyboard: a versioned document format for visual screen documents.
//!
//! This crate provides the persistence and data-binding core of a screen
//! authoring tool: the node graph, a backward-compatible JSON codec,
//! reference resolution and the variable and query engines evaluated at
//! run time.
//!
//! # Quick Start
//!
//! ```rust
//! use storyboard::codec::{decode_document, encode_document};
//! use storyboard::model::{DocumentBuilder, NodeBuilder, Stack, Text};
//!
//! let doc = DocumentBuilder::new()
//!     .screen("Home", |screen| {
//!         screen.child(NodeBuilder::new(Stack::default()).child(NodeBuilder::new(Text::new("Hello"))))
//!     })
//!     .build();
//!
//! let bytes = encode_document(&doc).unwrap();
//! let decoded = decode_document(&bytes).unwrap();
//! assert_eq!(doc, decoded);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Nodes, the node arena and the document with its resources
//! - [`codec`]: JSON encoding/decoding with version migrations and compression
//! - [`resolve`]: Relationship resolution for freshly decoded documents
//! - [`binding`]: Variables bound to component properties, data or assets
//! - [`query`]: Conditions and collection filtering, sorting and paging
//! - [`error`]: Error types
//! - [`limits`]: Format versions and decoding limits
//!
//! # Versions
//!
//! Every document carries `meta.version`. The decoder upgrades older shapes
//! step by step and rejects documents whose `compatibilityVersion` is newer
//! than [`limits::CURRENT_VERSION`]. The encoder always writes the current
//! layout.
//!
//! # Wire Format
//!
//! Documents are JSON objects, optionally wrapped in a zstd envelope:
//! - Plain: the JSON text
//! - Compressed: `SBDZ` magic + uncompressed size + zstd data
//!
//! The decoder automatically detects and handles both formats.

pub mod binding;
pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod query;
pub mod resolve;
pub mod util;

// Re-export commonly used types at crate root
pub use binding::{AssetRef, Binding, Properties, PropertyValue, Variable};
pub use codec::{
    DecodeOptions, EncodeOptions, decode_document, decode_document_with_options,
    encode_document, encode_document_compressed,
};
pub use error::{DecodeError, EncodeError, GraphError, ResolveError};
pub use model::{Document, DocumentBuilder, Id, Node, NodeBuilder, NodeGraph, NodeIndex, NodeKind};
pub use query::{Collection, Condition, Conditional, Predicate, Scalar};
pub use resolve::{IntegrityFault, ResolutionReport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
