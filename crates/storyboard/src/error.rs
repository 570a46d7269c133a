//! Error types for document decoding, encoding, resolution and graph edits.

use thiserror::Error;

use crate::model::{Id, NodeIndex};
use crate::resolve::IntegrityFault;

/// Error classes reported by [`DecodeError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// D001: Invalid envelope (magic, compression, JSON syntax, size)
    InvalidEnvelope,
    /// D002: Unsupported format version
    UnsupportedVersion,
    /// D003: Field shape does not match the selected version
    MalformedField,
    /// D004: Node identity problem (unknown type, duplicate id)
    InvalidIdentity,
    /// D005: Dangling or conflicting reference (strict mode only)
    IntegrityFault,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "D001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidEnvelope => "D001",
            ErrorCode::UnsupportedVersion => "D002",
            ErrorCode::MalformedField => "D003",
            ErrorCode::InvalidIdentity => "D004",
            ErrorCode::IntegrityFault => "D005",
        }
    }
}

/// Error while decoding a document. Fatal to the load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === D001: Envelope ===
    #[error("[D001] invalid JSON: {0}")]
    InvalidJson(String),

    #[error("[D001] document root must be a JSON object")]
    RootNotObject,

    #[error("[D001] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("[D001] varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("[D001] varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("[D001] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[D001] zstd decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("[D001] decompressed size {actual} doesn't match declared {declared}")]
    UncompressedSizeMismatch { declared: usize, actual: usize },

    // === D002: Version ===
    #[error("[D002] unsupported document version {version} (compatibility version {compatibility})")]
    UnsupportedVersion { version: u32, compatibility: u32 },

    // === D003: Field shape ===
    #[error("[D003] missing field {path}")]
    MissingField { path: String },

    #[error("[D003] invalid field {path}: expected {expected}")]
    InvalidField {
        path: String,
        expected: &'static str,
    },

    // === D004: Identity ===
    #[error("[D004] unknown node type {type_name:?} for node {id}")]
    UnknownNodeType { id: String, type_name: String },

    #[error("[D004] duplicate node id {id}")]
    DuplicateId { id: String },

    // === D005: Integrity ===
    #[error("[D005] {0}")]
    Resolve(#[from] ResolveError),
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::UnsupportedVersion { .. } => ErrorCode::UnsupportedVersion,
            DecodeError::MissingField { .. } | DecodeError::InvalidField { .. } => {
                ErrorCode::MalformedField
            }
            DecodeError::UnknownNodeType { .. } | DecodeError::DuplicateId { .. } => {
                ErrorCode::InvalidIdentity
            }
            DecodeError::Resolve(_) => ErrorCode::IntegrityFault,
            _ => ErrorCode::InvalidEnvelope,
        }
    }

    pub(crate) fn invalid(path: impl Into<String>, expected: &'static str) -> Self {
        DecodeError::InvalidField {
            path: path.into(),
            expected,
        }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        DecodeError::MissingField { path: path.into() }
    }
}

/// Error during document encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{path} is not a finite number: {value}")]
    NonFiniteNumber { path: String, value: f64 },

    #[error("{path} refers to {target}, which is not in the document")]
    DanglingReference { path: String, target: String },

    #[error("failed to serialize {path}: {message}")]
    Serialization { path: String, message: String },

    #[error("zstd compression failed: {0}")]
    CompressionFailed(String),
}

/// Error from the relationship resolution pass.
///
/// Only produced when strict reference checking is enabled; the default
/// policy logs faults and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("{} unresolved reference(s){}", .0.len(), first_fault(.0))]
    IntegrityFaults(Vec<IntegrityFault>),
}

fn first_fault(faults: &[IntegrityFault]) -> String {
    faults
        .first()
        .map(|fault| format!(", first: {fault}"))
        .unwrap_or_default()
}

/// Error from an attach/detach operation on the node graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node index {0:?} is out of bounds")]
    OutOfBounds(NodeIndex),

    #[error("node {child:?} already has parent {parent:?}")]
    AlreadyAttached { child: NodeIndex, parent: NodeIndex },

    #[error("node {0:?} cannot be attached to itself")]
    SelfAttach(NodeIndex),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle { parent: NodeIndex, child: NodeIndex },

    #[error("a node with id {0} already exists")]
    DuplicateId(Id),

    #[error("node {0:?} is not a main component")]
    NotAComponent(NodeIndex),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_faults_display() {
        assert_eq!(
            ResolveError::IntegrityFaults(Vec::new()).to_string(),
            "0 unresolved reference(s)"
        );

        let fault = IntegrityFault::MissingNode {
            owner: Some(Id::new("T")),
            field: "maskID".to_string(),
            target: Id::new("NOPE"),
        };
        assert_eq!(
            ResolveError::IntegrityFaults(vec![fault]).to_string(),
            "1 unresolved reference(s), first: node T.maskID refers to missing node NOPE"
        );
    }
}
