//! Control-channel session
//!
//! A [`Session`] owns a connected channel whose family id has been
//! resolved. Family ids are assigned when the module loads, so every
//! session starts with a lookup against the netlink controller before any
//! management request goes out.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use hwsim_proto::family::{self, FamilyReply};
use hwsim_proto::wire::MessageIter;
use hwsim_proto::FAMILY_NAME;

use crate::error::CtrlError;
use crate::link::{self, LinkRx, LinkTx};

/// Configuration for opening a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Generic netlink family to resolve
    pub family_name: String,
    /// How long to wait for the controller to answer the lookup
    pub resolve_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            family_name: FAMILY_NAME.to_string(),
            resolve_timeout: Duration::from_secs(1),
        }
    }
}

/// A connected control channel with its family id resolved
pub struct Session {
    pub(crate) tx: Box<dyn LinkTx>,
    pub(crate) rx: Box<dyn LinkRx>,
    family_id: u16,
    seq: u32,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("family_id", &self.family_id)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a generic netlink socket and resolve the configured family.
    pub async fn connect(config: &SessionConfig) -> Result<Self, CtrlError> {
        let (tx, rx) = link::connect().map_err(CtrlError::ChannelOpen)?;
        Self::over_link(Box::new(tx), Box::new(rx), config).await
    }

    /// Resolve the configured family over an already-open channel.
    pub async fn over_link(
        mut tx: Box<dyn LinkTx>,
        mut rx: Box<dyn LinkRx>,
        config: &SessionConfig,
    ) -> Result<Self, CtrlError> {
        let seq = 1;
        let query = family::encode_family_query(&config.family_name, seq)?;
        tx.send_frame(&query).await.map_err(CtrlError::Send)?;

        let family_id = tokio::time::timeout(
            config.resolve_timeout,
            await_family_reply(rx.as_mut(), &config.family_name, seq),
        )
        .await
        .map_err(|_| CtrlError::FamilyLookupTimeout(config.family_name.clone()))??;

        debug!("Resolved family {} to id {:#x}", config.family_name, family_id);
        Ok(Self {
            tx,
            rx,
            family_id,
            seq,
        })
    }

    /// Numeric id the kernel assigned to the family.
    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    /// Hand out the next request sequence number.
    pub(crate) fn next_seq(&mut self) -> u32 {
        self.seq += 1;
        self.seq
    }
}

async fn await_family_reply(
    rx: &mut dyn LinkRx,
    name: &str,
    seq: u32,
) -> Result<u16, CtrlError> {
    loop {
        let datagram = rx.recv_frame().await.map_err(CtrlError::Recv)?;
        trace!("Received {} byte datagram during family lookup", datagram.len());
        for message in MessageIter::new(&datagram) {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    warn!("Skipping malformed frame during family lookup: {}", e);
                    break;
                }
            };
            match family::parse_family_reply(&message, seq)? {
                Some(FamilyReply::Resolved { family_id }) => return Ok(family_id),
                Some(FamilyReply::NotRegistered) => {
                    return Err(CtrlError::FamilyNotRegistered(name.to_string()));
                }
                Some(FamilyReply::Failed { code }) => {
                    return Err(CtrlError::FamilyLookup {
                        name: name.to_string(),
                        code,
                    });
                }
                None => continue,
            }
        }
    }
}
