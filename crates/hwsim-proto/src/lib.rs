//! Wire protocol for managing simulated radios
//!
//! This crate speaks the generic netlink dialect of the `mac80211_hwsim`
//! kernel module:
//!
//! - **wire**: netlink/genl framing, attribute TLVs, request building
//! - **family**: resolving the family name to its numeric id via `nlctrl`
//! - **command**: the management operations and their terminal outcomes
//! - **radio**: the family-specific codec and reply classification
//!
//! # Architecture
//!
//! Encoding and classification are pure byte-level functions with no I/O;
//! transports live in `hwsim-ctrl`. Everything is native-endian, matching
//! the netlink convention of never crossing a host boundary.
//!
//! # Example
//!
//! ```rust
//! use hwsim_proto::{decode_request, encode_request, Operation};
//! use hwsim_proto::wire::MessageIter;
//!
//! let op = Operation::DeleteById { radio_id: 3 };
//! let frame = encode_request(&op, 0x21, 1).unwrap();
//!
//! let msg = MessageIter::new(&frame).next().unwrap().unwrap();
//! assert_eq!(decode_request(&msg).unwrap(), op);
//! ```

pub mod command;
pub mod error;
pub mod family;
pub mod radio;
pub mod wire;

pub use command::{Operation, OperationKind, Outcome, UNKNOWN_RADIO_ID};
pub use error::{EncodeError, ParseError};
pub use radio::{
    classify_reply, decode_request, encode_request, Classified, RadioCommand, ENODEV, FAMILY_NAME,
};
