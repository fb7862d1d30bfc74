//! Control-channel client for simulated-radio management
//!
//! This crate drives management operations against the `mac80211_hwsim`
//! kernel module over generic netlink.
//!
//! # Architecture
//!
//! An invocation flows through three layers:
//!
//! - **session**: opens the channel and resolves the family name to its
//!   numeric id via the netlink controller
//! - **dispatcher**: a background listener armed for one operation, which
//!   classifies every inbound frame and delivers exactly one terminal
//!   [`Outcome`](hwsim_proto::Outcome)
//! - **coordinator**: arms the dispatcher, then sends and settles under a
//!   configurable reply deadline
//!
//! The transport sits behind the [`LinkTx`]/[`LinkRx`] trait pair, so
//! tests run the same client against an in-process kernel stand-in.
//!
//! # Example
//!
//! ```rust,no_run
//! use hwsim_ctrl::{run, CoordinatorConfig};
//! use hwsim_proto::Operation;
//!
//! # async fn demo() -> Result<(), hwsim_ctrl::CtrlError> {
//! let op = Operation::DeleteById { radio_id: 0 };
//! let outcome = run(&op, &CoordinatorConfig::default()).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod link;
pub mod session;

// Re-export coordinator types
pub use coordinator::{run, run_over, CoordinatorConfig, DEFAULT_REPLY_TIMEOUT};

// Re-export dispatcher types
pub use dispatcher::{arm, ArmedDispatcher};

// Re-export transport types
pub use link::{GenlRx, GenlTx, LinkRx, LinkTx};

pub use error::CtrlError;
pub use session::{Session, SessionConfig};
