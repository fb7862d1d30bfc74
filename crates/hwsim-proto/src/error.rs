//! Error types for netlink wire parsing and request encoding

use thiserror::Error;

/// Errors that can occur while parsing inbound netlink data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is too short for the structure being read
    #[error("truncated message: need {needed} more bytes")]
    Truncated { needed: usize },

    /// A message header carries a length field that cannot be right
    #[error("malformed message length {0}")]
    BadLength(u32),

    /// An attribute header describes a payload that overruns the buffer
    #[error("attribute {tag} overruns its buffer")]
    AttributeOverrun { tag: u16 },

    /// An attribute payload has the wrong size for its expected type
    #[error("attribute {tag} has {len} byte payload, expected {expected}")]
    BadAttributeLength { tag: u16, len: usize, expected: usize },

    /// A string attribute is not valid UTF-8
    #[error("attribute {tag} is not a valid string")]
    BadString { tag: u16 },

    /// Unknown or unsupported command code
    #[error("unknown command code {0}")]
    UnknownCommand(u8),

    /// The message does not have the shape the caller asked for
    #[error("unexpected message: {0}")]
    Unexpected(&'static str),
}

/// Errors that can occur while building a request message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A required string field was empty
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// String attributes travel NUL-terminated and cannot contain NUL
    #[error("{field} contains an interior NUL byte")]
    EmbeddedNul { field: &'static str },

    /// Attribute payload does not fit the 16-bit length field
    #[error("{field} is too long to encode ({len} bytes)")]
    Oversize { field: &'static str, len: usize },
}
