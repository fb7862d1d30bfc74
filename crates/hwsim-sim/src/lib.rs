//! Kernel stand-in for control-channel testing
//!
//! This crate lets the control client run end to end without the real
//! kernel module loaded:
//!
//! - **channel**: an in-memory datagram channel implementing the client's
//!   transport traits
//! - **kernel**: a task that answers family lookups and management
//!   requests from a configurable radio table
//!
//! The stand-in reproduces the module's reply quirks so client behavior
//! tested here carries over to the real channel.

pub mod channel;
pub mod kernel;

pub use channel::{pair, ChanRx, ChanTx, Peer};
pub use kernel::{CreateReply, ReplyMode, SimKernel, SimKernelConfig, SimRadio};
