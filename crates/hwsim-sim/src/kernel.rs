//! Simulated kernel module
//!
//! Owns a radio table and answers control-channel requests the way
//! `mac80211_hwsim` does, including its quirks: creations report the new
//! id through the status code, and signal updates arrive on the
//! radio-query command. Failure modes are configurable so client tests can
//! exercise silence, duplicate replies and plain acknowledgments.

use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use hwsim_proto::family;
use hwsim_proto::radio::{attr, GENL_VERSION};
use hwsim_proto::wire::{build_status_frame, MessageIter, NlHeader, NlMessage, RequestBuilder};
use hwsim_proto::{decode_request, Operation, RadioCommand, ENODEV, FAMILY_NAME};

use crate::channel::{pair, ChanRx, ChanTx, Peer};

/// errno for a request the kernel cannot decode
const EINVAL: i32 = 22;

/// How creations are acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateReply {
    /// Report the new radio's id through the status code
    IdInStatus,
    /// Plain acknowledgment carrying no id
    PlainAck,
}

/// How replies are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyMode {
    /// Answer every request once
    Normal,
    /// Swallow management requests; family lookups are still answered
    Silent,
    /// Send every reply twice
    Duplicate,
}

/// One simulated radio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRadio {
    /// Numeric id
    pub id: u32,
    /// Device name
    pub name: String,
    /// Channel count requested at creation, 0 for the module default
    pub channel_count: u32,
    /// Created without an automatic network interface
    pub no_auto_interface: bool,
    /// Created in channel-context mode
    pub use_channel_contexts: bool,
    /// Last signal strength applied, in dBm
    pub rssi_dbm: Option<i32>,
}

/// Configuration for the simulated kernel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimKernelConfig {
    /// Family name registered with the controller
    pub family_name: String,
    /// Family id handed out on lookups
    pub family_id: u16,
    /// Id assigned to the next created radio
    pub first_radio_id: u32,
    /// Radios present at start
    pub radios: Vec<SimRadio>,
    /// How creations are acknowledged
    pub create_reply: CreateReply,
    /// How replies are delivered
    pub reply_mode: ReplyMode,
    /// Answer signal updates with a radio dump before the acknowledgment
    pub data_reply_before_ack: bool,
}

impl Default for SimKernelConfig {
    fn default() -> Self {
        Self {
            family_name: FAMILY_NAME.to_string(),
            family_id: 0x21,
            first_radio_id: 0,
            radios: Vec::new(),
            create_reply: CreateReply::IdInStatus,
            reply_mode: ReplyMode::Normal,
            data_reply_before_ack: true,
        }
    }
}

/// Handle to a running simulated kernel
pub struct SimKernel {
    task: JoinHandle<Vec<SimRadio>>,
}

impl SimKernel {
    /// Spawn a simulated kernel and hand back the client-side halves.
    pub fn spawn(config: SimKernelConfig) -> (Self, ChanTx, ChanRx) {
        let (tx, rx, peer) = pair();
        let task = tokio::spawn(serve(config, peer));
        (Self { task }, tx, rx)
    }

    /// Wait for the kernel to stop and return its final radio table.
    ///
    /// The kernel stops once the client-side halves are dropped.
    pub async fn into_radios(self) -> Result<Vec<SimRadio>, JoinError> {
        self.task.await
    }
}

async fn serve(config: SimKernelConfig, mut peer: Peer) -> Vec<SimRadio> {
    info!(
        "Simulated kernel serving family {} as {:#x}",
        config.family_name, config.family_id
    );
    let mut state = KernelState::new(config);

    while let Some(datagram) = peer.from_client.recv().await {
        for message in MessageIter::new(&datagram) {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    warn!("Dropping malformed datagram: {}", e);
                    break;
                }
            };
            for reply in state.respond(&message) {
                if peer.to_client.send(reply).await.is_err() {
                    debug!("Client receive half closed; simulated kernel stopping");
                    return state.radios;
                }
            }
        }
    }
    debug!("Client channel closed; simulated kernel stopping");
    state.radios
}

/// Radio table plus the creation counter
struct KernelState {
    config: SimKernelConfig,
    radios: Vec<SimRadio>,
    next_id: u32,
}

impl KernelState {
    fn new(config: SimKernelConfig) -> Self {
        let radios = config.radios.clone();
        let next_id = config.first_radio_id;
        Self {
            config,
            radios,
            next_id,
        }
    }

    /// Replies owed for one inbound message, in send order.
    fn respond(&mut self, message: &NlMessage<'_>) -> Vec<Vec<u8>> {
        match family::parse_family_query(message) {
            Ok(Some(name)) => return self.family_lookup(&name, &message.header),
            Ok(None) => {}
            Err(e) => {
                warn!("Dropping malformed controller message: {}", e);
                return Vec::new();
            }
        }
        if message.header.ty != self.config.family_id {
            debug!("Dropping message for unknown family {:#x}", message.header.ty);
            return Vec::new();
        }
        if self.config.reply_mode == ReplyMode::Silent {
            debug!("Silent mode: swallowing management request");
            return Vec::new();
        }
        let mut replies = match decode_request(message) {
            Ok(op) => self.apply(op, &message.header),
            Err(e) => {
                warn!("Rejecting undecodable request: {}", e);
                vec![build_status_frame(-EINVAL, &message.header)]
            }
        };
        if self.config.reply_mode == ReplyMode::Duplicate {
            let again = replies.clone();
            replies.extend(again);
        }
        replies
    }

    fn family_lookup(&self, name: &str, request: &NlHeader) -> Vec<Vec<u8>> {
        if name == self.config.family_name {
            match family::encode_family_reply(name, self.config.family_id, request.seq) {
                Ok(reply) => vec![reply],
                Err(e) => {
                    warn!("Failed to encode family reply: {}", e);
                    Vec::new()
                }
            }
        } else {
            debug!("Lookup for unregistered family {}", name);
            vec![build_status_frame(-family::ENOENT, request)]
        }
    }

    fn apply(&mut self, op: Operation, request: &NlHeader) -> Vec<Vec<u8>> {
        match op {
            Operation::CreateRadio {
                name,
                channel_count,
                no_auto_interface,
                use_channel_contexts,
                ..
            } => {
                let id = self.next_id;
                self.next_id += 1;
                let name = name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("hwsim{}", id));
                debug!("Creating radio {} ({})", id, name);
                self.radios.push(SimRadio {
                    id,
                    name,
                    channel_count,
                    no_auto_interface,
                    use_channel_contexts,
                    rssi_dbm: None,
                });
                let code = match self.config.create_reply {
                    CreateReply::IdInStatus => id as i32,
                    CreateReply::PlainAck => 0,
                };
                vec![build_status_frame(code, request)]
            }
            Operation::DeleteById { radio_id } => {
                match self.radios.iter().position(|r| r.id == radio_id) {
                    Some(index) => {
                        debug!("Deleting radio {}", radio_id);
                        self.radios.remove(index);
                        vec![build_status_frame(0, request)]
                    }
                    None => vec![build_status_frame(-ENODEV, request)],
                }
            }
            Operation::DeleteByName { radio_name } => {
                match self.radios.iter().position(|r| r.name == radio_name) {
                    Some(index) => {
                        debug!("Deleting radio named {}", radio_name);
                        self.radios.remove(index);
                        vec![build_status_frame(0, request)]
                    }
                    None => vec![build_status_frame(-ENODEV, request)],
                }
            }
            Operation::SetSignalStrength { radio_id, rssi_dbm } => {
                match self.radios.iter_mut().find(|r| r.id == radio_id) {
                    Some(radio) => {
                        radio.rssi_dbm = Some(rssi_dbm.wrapping_neg());
                        debug!("Radio {} signal set to {} dBm", radio_id, rssi_dbm.wrapping_neg());
                        let mut replies = Vec::new();
                        if self.config.data_reply_before_ack {
                            replies.push(radio_dump(radio, self.config.family_id, request.seq));
                        }
                        replies.push(build_status_frame(0, request));
                        replies
                    }
                    None => vec![build_status_frame(-ENODEV, request)],
                }
            }
        }
    }
}

/// A radio-query data reply describing one radio
fn radio_dump(radio: &SimRadio, family_id: u16, seq: u32) -> Vec<u8> {
    let mut reply = RequestBuilder::new(family_id, 0, seq, RadioCommand::GetRadio as u8, GENL_VERSION);
    reply.put_u32(attr::RADIO_ID, radio.id);
    if radio.channel_count != 0 {
        reply.put_u32(attr::CHANNELS, radio.channel_count);
    }
    reply.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwsim_proto::encode_request;
    use hwsim_proto::wire::NLMSG_ERROR;

    fn first(frame: &[u8]) -> NlMessage<'_> {
        MessageIter::new(frame).next().unwrap().unwrap()
    }

    fn status_code(frame: &[u8]) -> i32 {
        first(frame).as_status().unwrap().code
    }

    fn state() -> KernelState {
        KernelState::new(SimKernelConfig::default())
    }

    fn create_op(name: Option<&str>) -> Operation {
        Operation::CreateRadio {
            name: name.map(str::to_owned),
            channel_count: 2,
            no_auto_interface: false,
            use_channel_contexts: false,
            regulatory_alpha2: None,
            regulatory_domain: 0,
        }
    }

    #[test]
    fn test_family_lookup_answers_registered_name() {
        let mut state = state();
        let query = family::encode_family_query(FAMILY_NAME, 1).unwrap();
        let replies = state.respond(&first(&query));

        assert_eq!(replies.len(), 1);
        let reply = first(&replies[0]);
        assert_eq!(
            family::parse_family_reply(&reply, 1).unwrap(),
            Some(family::FamilyReply::Resolved { family_id: 0x21 })
        );
    }

    #[test]
    fn test_family_lookup_rejects_unknown_name() {
        let mut state = state();
        let query = family::encode_family_query("NO_SUCH_FAMILY", 1).unwrap();
        let replies = state.respond(&first(&query));

        assert_eq!(replies.len(), 1);
        assert_eq!(status_code(&replies[0]), -family::ENOENT);
    }

    #[test]
    fn test_create_assigns_sequential_ids_and_names() {
        let mut state = state();
        for expected_id in [0, 1] {
            let frame = encode_request(&create_op(None), 0x21, 2).unwrap();
            let replies = state.respond(&first(&frame));
            assert_eq!(replies.len(), 1);
            assert_eq!(status_code(&replies[0]), expected_id);
        }
        assert_eq!(state.radios[0].name, "hwsim0");
        assert_eq!(state.radios[1].name, "hwsim1");
        assert_eq!(state.radios[0].channel_count, 2);
    }

    #[test]
    fn test_plain_ack_mode_acks_with_zero() {
        let mut state = KernelState::new(SimKernelConfig {
            first_radio_id: 5,
            create_reply: CreateReply::PlainAck,
            ..SimKernelConfig::default()
        });
        let frame = encode_request(&create_op(Some("radio5")), 0x21, 2).unwrap();
        let replies = state.respond(&first(&frame));

        assert_eq!(status_code(&replies[0]), 0);
        assert_eq!(state.radios[0].id, 5);
        assert_eq!(state.radios[0].name, "radio5");
    }

    #[test]
    fn test_delete_unknown_radio_reports_enodev() {
        let mut state = state();
        let frame = encode_request(&Operation::DeleteById { radio_id: 42 }, 0x21, 2).unwrap();
        let replies = state.respond(&first(&frame));
        assert_eq!(status_code(&replies[0]), -ENODEV);
    }

    #[test]
    fn test_signal_update_stores_negated_dbm() {
        let mut state = KernelState::new(SimKernelConfig {
            radios: vec![SimRadio {
                id: 3,
                name: "hwsim3".into(),
                channel_count: 1,
                no_auto_interface: false,
                use_channel_contexts: false,
                rssi_dbm: None,
            }],
            ..SimKernelConfig::default()
        });
        let op = Operation::SetSignalStrength {
            radio_id: 3,
            rssi_dbm: 50,
        };
        let frame = encode_request(&op, 0x21, 2).unwrap();
        let replies = state.respond(&first(&frame));

        // a radio dump precedes the acknowledgment
        assert_eq!(replies.len(), 2);
        assert_ne!(first(&replies[0]).header.ty, NLMSG_ERROR);
        assert_eq!(status_code(&replies[1]), 0);
        assert_eq!(state.radios[0].rssi_dbm, Some(-50));
    }

    #[test]
    fn test_silent_mode_swallows_requests_but_answers_lookups() {
        let mut state = KernelState::new(SimKernelConfig {
            reply_mode: ReplyMode::Silent,
            ..SimKernelConfig::default()
        });

        let query = family::encode_family_query(FAMILY_NAME, 1).unwrap();
        assert_eq!(state.respond(&first(&query)).len(), 1);

        let frame = encode_request(&create_op(None), 0x21, 2).unwrap();
        assert!(state.respond(&first(&frame)).is_empty());
    }

    #[test]
    fn test_duplicate_mode_doubles_replies() {
        let mut state = KernelState::new(SimKernelConfig {
            reply_mode: ReplyMode::Duplicate,
            ..SimKernelConfig::default()
        });
        let frame = encode_request(&create_op(None), 0x21, 2).unwrap();
        let replies = state.respond(&first(&frame));

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], replies[1]);
    }

    #[tokio::test]
    async fn test_kernel_stops_when_client_drops() {
        let (kernel, tx, rx) = SimKernel::spawn(SimKernelConfig::default());
        drop(tx);
        drop(rx);
        let radios = kernel.into_radios().await.unwrap();
        assert!(radios.is_empty());
    }
}
