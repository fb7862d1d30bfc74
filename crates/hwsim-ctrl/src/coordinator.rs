//! Operation coordinator
//!
//! Runs one operation end to end: pick a sequence number, encode the
//! request, arm the dispatcher, send, and wait for the terminal outcome.
//! One invocation drives exactly one operation; nothing here retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hwsim_proto::{encode_request, Operation, Outcome};

use crate::dispatcher;
use crate::error::CtrlError;
use crate::session::{Session, SessionConfig};

/// Reply deadline applied when the caller does not configure one
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for running one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Session to open
    pub session: SessionConfig,
    /// How long to wait for the kernel's reply
    pub reply_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }
}

/// Open a session and run `op` to its terminal outcome.
pub async fn run(op: &Operation, config: &CoordinatorConfig) -> Result<Outcome, CtrlError> {
    let session = Session::connect(&config.session).await?;
    run_over(session, op, config.reply_timeout).await
}

/// Run `op` over an already-open session.
///
/// The dispatcher is armed before the request goes out, so a reply that
/// beats the send cannot be lost.
pub async fn run_over(
    mut session: Session,
    op: &Operation,
    reply_timeout: Duration,
) -> Result<Outcome, CtrlError> {
    let seq = session.next_seq();
    let frame = encode_request(op, session.family_id(), seq)?;
    debug!("Sending {:?} under seq {}", op, seq);

    let Session { mut tx, rx, .. } = session;
    let armed = dispatcher::arm(rx, op.kind(), seq);
    // on send failure the armed dispatcher drops here, which tears the
    // listener down with it
    tx.send_frame(&frame).await.map_err(CtrlError::Send)?;

    Ok(armed.settle(reply_timeout).await)
}
