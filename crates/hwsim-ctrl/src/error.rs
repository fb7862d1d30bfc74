//! Error types for the control-channel client

use thiserror::Error;

use hwsim_proto::{EncodeError, ParseError};

/// Errors that can occur while driving an operation
#[derive(Debug, Error)]
pub enum CtrlError {
    /// Opening or configuring the control channel failed
    #[error("failed to open control channel: {0}")]
    ChannelOpen(#[source] std::io::Error),

    /// The kernel does not know the requested family
    #[error("family {0} not registered")]
    FamilyNotRegistered(String),

    /// The controller refused the family lookup
    #[error("family lookup for {name} failed with code {code}")]
    FamilyLookup {
        /// Requested family name
        name: String,
        /// errno reported by the controller
        code: i32,
    },

    /// No controller reply arrived within the resolve timeout
    #[error("family lookup for {0} timed out")]
    FamilyLookupTimeout(String),

    /// A received frame could not be parsed
    #[error("protocol error: {0}")]
    Parse(#[from] ParseError),

    /// A request could not be encoded
    #[error("encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// Sending a request failed
    #[error("failed to send request: {0}")]
    Send(#[source] std::io::Error),

    /// Receiving a reply failed
    #[error("failed to receive reply: {0}")]
    Recv(#[source] std::io::Error),
}
