//! Format versions and decoding limits.

/// Format version written by this crate.
pub const CURRENT_VERSION: u32 = 10;

/// Oldest format version the decoder still accepts.
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Version that introduced `meta.compatibilityVersion`.
///
/// Older documents have no such field; their compatibility version is their
/// format version.
pub const COMPATIBILITY_VERSION_INTRODUCED: u32 = 4;

/// Magic prefix of a zstd-compressed document.
pub const MAGIC_COMPRESSED: &[u8; 4] = b"SBDZ";

/// Maximum size of a document, compressed input and decompressed JSON alike.
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// Maximum bytes in a LEB128 varint.
pub const MAX_VARINT_BYTES: usize = 10;
