//! Radio-management codec for the simulated-hardware family
//!
//! Encodes [`Operation`] values into family-addressed requests, decodes them
//! back (for test doubles standing in for the kernel), and classifies the
//! frames that come back while an operation is in flight.
//!
//! Optional request fields follow present-or-absent semantics: the module
//! distinguishes a missing attribute from an explicit zero, so zero counts,
//! empty strings and false flags are never emitted.

use crate::command::{Operation, OperationKind, Outcome, UNKNOWN_RADIO_ID};
use crate::error::{EncodeError, ParseError};
use crate::wire::{NlMessage, RequestBuilder, NLMSG_ERROR, NLM_F_ACK, NLM_F_REQUEST};

/// Generic netlink name the kernel module registers under
pub const FAMILY_NAME: &str = "MAC80211_HWSIM";
/// Protocol version carried in every request's genl header
pub const GENL_VERSION: u8 = 1;
/// errno for "no such device"
pub const ENODEV: i32 = 19;

/// Command ids of the management family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RadioCommand {
    NewRadio = 4,
    DelRadio = 5,
    /// Also carries signal updates; see [`encode_request`]
    GetRadio = 6,
}

impl TryFrom<u8> for RadioCommand {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, ParseError> {
        match value {
            4 => Ok(RadioCommand::NewRadio),
            5 => Ok(RadioCommand::DelRadio),
            6 => Ok(RadioCommand::GetRadio),
            other => Err(ParseError::UnknownCommand(other)),
        }
    }
}

/// Attribute ids of the management family
pub mod attr {
    /// Signal strength in dBm, stored negated (u32)
    pub const SIGNAL: u16 = 6;
    /// Channel count (u32)
    pub const CHANNELS: u16 = 9;
    /// Numeric radio id (u32)
    pub const RADIO_ID: u16 = 10;
    /// Two-letter regulatory hint (string)
    pub const REG_HINT_ALPHA2: u16 = 11;
    /// Custom regulatory domain index (u32)
    pub const REG_CUSTOM_REG: u16 = 12;
    /// Channel-context operation (flag)
    pub const USE_CHANCTX: u16 = 15;
    /// Device name (string)
    pub const RADIO_NAME: u16 = 17;
    /// Suppress automatic interface creation (flag)
    pub const NO_VIF: u16 = 18;
}

/// Encode `op` as a request addressed to `family_id`.
///
/// Every request asks for an acknowledgment, so a success is always
/// observable as a status frame. Signal updates go out under
/// [`RadioCommand::GetRadio`]: the module registers its signal handler on
/// the radio-query command id, and a dedicated command does not exist.
pub fn encode_request(op: &Operation, family_id: u16, seq: u32) -> Result<Vec<u8>, EncodeError> {
    let flags = NLM_F_REQUEST | NLM_F_ACK;
    match op {
        Operation::CreateRadio {
            name,
            channel_count,
            no_auto_interface,
            use_channel_contexts,
            regulatory_alpha2,
            regulatory_domain,
        } => {
            let mut req = RequestBuilder::new(
                family_id,
                flags,
                seq,
                RadioCommand::NewRadio as u8,
                GENL_VERSION,
            );
            if *channel_count != 0 {
                req.put_u32(attr::CHANNELS, *channel_count);
            }
            if *no_auto_interface {
                req.put_flag(attr::NO_VIF);
            }
            if let Some(name) = name.as_deref().filter(|n| !n.is_empty()) {
                req.put_str(attr::RADIO_NAME, name, "radio name")?;
            }
            if *use_channel_contexts {
                req.put_flag(attr::USE_CHANCTX);
            }
            if let Some(alpha2) = regulatory_alpha2.as_deref().filter(|a| !a.is_empty()) {
                req.put_str(attr::REG_HINT_ALPHA2, alpha2, "regulatory hint")?;
            }
            if *regulatory_domain != 0 {
                req.put_u32(attr::REG_CUSTOM_REG, *regulatory_domain);
            }
            Ok(req.finish())
        }
        Operation::DeleteById { radio_id } => {
            let mut req = RequestBuilder::new(
                family_id,
                flags,
                seq,
                RadioCommand::DelRadio as u8,
                GENL_VERSION,
            );
            req.put_u32(attr::RADIO_ID, *radio_id);
            Ok(req.finish())
        }
        Operation::DeleteByName { radio_name } => {
            if radio_name.is_empty() {
                return Err(EncodeError::EmptyField { field: "radio name" });
            }
            let mut req = RequestBuilder::new(
                family_id,
                flags,
                seq,
                RadioCommand::DelRadio as u8,
                GENL_VERSION,
            );
            req.put_str(attr::RADIO_NAME, radio_name, "radio name")?;
            Ok(req.finish())
        }
        Operation::SetSignalStrength { radio_id, rssi_dbm } => {
            let mut req = RequestBuilder::new(
                family_id,
                flags,
                seq,
                RadioCommand::GetRadio as u8,
                GENL_VERSION,
            );
            req.put_u32(attr::SIGNAL, rssi_dbm.wrapping_neg() as u32);
            req.put_u32(attr::RADIO_ID, *radio_id);
            Ok(req.finish())
        }
    }
}

/// Decode a family-addressed request back into the operation it encodes.
///
/// The inverse of [`encode_request`], used by kernel stand-ins.
pub fn decode_request(msg: &NlMessage<'_>) -> Result<Operation, ParseError> {
    let command = RadioCommand::try_from(msg.genl_cmd()?)?;
    match command {
        RadioCommand::NewRadio => {
            let mut name = None;
            let mut channel_count = 0;
            let mut no_auto_interface = false;
            let mut use_channel_contexts = false;
            let mut regulatory_alpha2 = None;
            let mut regulatory_domain = 0;
            for attr in msg.attrs()? {
                let attr = attr?;
                match attr.tag {
                    attr::CHANNELS => channel_count = attr.as_u32()?,
                    attr::NO_VIF => no_auto_interface = true,
                    attr::RADIO_NAME => name = Some(attr.as_str()?.to_owned()),
                    attr::USE_CHANCTX => use_channel_contexts = true,
                    attr::REG_HINT_ALPHA2 => regulatory_alpha2 = Some(attr.as_str()?.to_owned()),
                    attr::REG_CUSTOM_REG => regulatory_domain = attr.as_u32()?,
                    _ => {}
                }
            }
            Ok(Operation::CreateRadio {
                name,
                channel_count,
                no_auto_interface,
                use_channel_contexts,
                regulatory_alpha2,
                regulatory_domain,
            })
        }
        RadioCommand::DelRadio => {
            let mut radio_id = None;
            let mut radio_name = None;
            for attr in msg.attrs()? {
                let attr = attr?;
                match attr.tag {
                    attr::RADIO_ID => radio_id = Some(attr.as_u32()?),
                    attr::RADIO_NAME => radio_name = Some(attr.as_str()?.to_owned()),
                    _ => {}
                }
            }
            match (radio_id, radio_name) {
                (Some(radio_id), None) => Ok(Operation::DeleteById { radio_id }),
                (None, Some(radio_name)) => Ok(Operation::DeleteByName { radio_name }),
                _ => Err(ParseError::Unexpected("delete must name exactly one target")),
            }
        }
        RadioCommand::GetRadio => {
            let mut signal = None;
            let mut radio_id = None;
            for attr in msg.attrs()? {
                let attr = attr?;
                match attr.tag {
                    attr::SIGNAL => signal = Some(attr.as_u32()?),
                    attr::RADIO_ID => radio_id = Some(attr.as_u32()?),
                    _ => {}
                }
            }
            match (signal, radio_id) {
                (Some(raw), Some(radio_id)) => Ok(Operation::SetSignalStrength {
                    radio_id,
                    rssi_dbm: (raw as i32).wrapping_neg(),
                }),
                (Some(_), None) => Err(ParseError::Unexpected("signal update without a radio id")),
                (None, _) => Err(ParseError::Unexpected("radio query without a signal attribute")),
            }
        }
    }
}

/// What one inbound frame means for an operation in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified {
    /// Settles the operation with this outcome
    Terminal(Outcome),
    /// Says nothing about the operation; keep listening
    Ignored(&'static str),
}

/// Classify one received message against the operation armed under `seq`.
///
/// Only status frames settle an operation. A zero code acknowledges
/// success; for creations a non-negative code is the assigned radio id
/// travelling down the error path, the module's way of reporting it.
pub fn classify_reply(msg: &NlMessage<'_>, kind: OperationKind, seq: u32) -> Classified {
    if msg.header.seq != seq {
        return Classified::Ignored("foreign sequence number");
    }
    if msg.header.ty != NLMSG_ERROR {
        return Classified::Ignored("not a status frame");
    }
    let status = match msg.as_status() {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!("Failed to parse status frame: {}", e);
            return Classified::Ignored("truncated status frame");
        }
    };
    if status.is_ack() {
        let outcome = match kind {
            OperationKind::Create => Outcome::Created {
                radio_id: UNKNOWN_RADIO_ID,
            },
            OperationKind::Delete => Outcome::Deleted,
            OperationKind::SetSignal => Outcome::SignalSet,
        };
        return Classified::Terminal(outcome);
    }
    if kind == OperationKind::Create && status.code >= 0 {
        return Classified::Terminal(Outcome::Created {
            radio_id: status.code,
        });
    }
    Classified::Terminal(Outcome::Failed {
        kernel_error_code: status.code,
    })
}
