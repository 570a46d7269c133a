//! JSON encoding/decoding for storyboard documents.
//!
//! Decoding is version-gated: historical shapes are upgraded by the
//! [`migration`] steps before the current-layout decoders run.

pub mod document;
pub mod migration;
pub(crate) mod node;
pub mod primitives;
pub(crate) mod value;

pub use document::{
    DecodeOptions, EncodeOptions, decode_document, decode_document_with_options,
    encode_document, encode_document_compressed, encode_document_compressed_with_options,
    encode_document_with_options,
};
pub use migration::Migration;
pub use primitives::{Reader, Writer};
