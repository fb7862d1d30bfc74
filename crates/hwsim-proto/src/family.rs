//! Generic netlink family resolution
//!
//! Family-addressed requests need a numeric family id, and the id is
//! assigned at module load time. The `nlctrl` controller resolves a family
//! name to its id: send `CTRL_CMD_GETFAMILY` with the name, read the id out
//! of the `CTRL_ATTR_FAMILY_ID` attribute of the `CTRL_CMD_NEWFAMILY` reply.

use crate::error::{EncodeError, ParseError};
use crate::wire::{NlMessage, RequestBuilder, NLMSG_ERROR, NLM_F_REQUEST};

/// Fixed family id of the netlink controller itself
pub const GENL_ID_CTRL: u16 = 0x10;
/// Controller command: resolve a family by name
pub const CTRL_CMD_GETFAMILY: u8 = 3;
/// Controller command: describes one family
pub const CTRL_CMD_NEWFAMILY: u8 = 1;
/// Attribute: numeric family id (u16)
pub const CTRL_ATTR_FAMILY_ID: u16 = 1;
/// Attribute: family name (string)
pub const CTRL_ATTR_FAMILY_NAME: u16 = 2;

/// errno returned when no family matches the requested name
pub const ENOENT: i32 = 2;

const CTRL_VERSION: u8 = 1;

/// Encode a family lookup for `name`.
///
/// Sent without `NLM_F_ACK`; the descriptive reply settles the lookup on
/// its own.
pub fn encode_family_query(name: &str, seq: u32) -> Result<Vec<u8>, EncodeError> {
    if name.is_empty() {
        return Err(EncodeError::EmptyField {
            field: "family name",
        });
    }
    let mut req = RequestBuilder::new(GENL_ID_CTRL, NLM_F_REQUEST, seq, CTRL_CMD_GETFAMILY, CTRL_VERSION);
    req.put_str(CTRL_ATTR_FAMILY_NAME, name, "family name")?;
    Ok(req.finish())
}

/// What one controller message says about a pending lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyReply {
    /// Lookup succeeded
    Resolved { family_id: u16 },
    /// No such family; usually the module is not loaded
    NotRegistered,
    /// Controller refused the lookup for some other reason
    Failed { code: i32 },
}

/// Interpret one received message against a lookup in flight.
///
/// Returns `None` for messages that say nothing about the lookup: foreign
/// sequence numbers, plain acks, unrelated frame types.
pub fn parse_family_reply(msg: &NlMessage<'_>, seq: u32) -> Result<Option<FamilyReply>, ParseError> {
    if msg.header.seq != seq {
        return Ok(None);
    }
    if msg.header.ty == NLMSG_ERROR {
        let status = msg.as_status()?;
        if status.is_ack() {
            return Ok(None);
        }
        if status.code == -ENOENT {
            return Ok(Some(FamilyReply::NotRegistered));
        }
        return Ok(Some(FamilyReply::Failed { code: status.code }));
    }
    if msg.header.ty != GENL_ID_CTRL || msg.genl_cmd()? != CTRL_CMD_NEWFAMILY {
        return Ok(None);
    }
    for attr in msg.attrs()? {
        let attr = attr?;
        if attr.tag == CTRL_ATTR_FAMILY_ID {
            let family_id = attr.as_u16()?;
            return Ok(Some(FamilyReply::Resolved { family_id }));
        }
    }
    // a family description without an id is malformed
    Err(ParseError::Unexpected("family reply carried no id"))
}

/// Extract the family name from a `CTRL_CMD_GETFAMILY` request.
///
/// Returns `None` for messages that are not controller lookups.
pub fn parse_family_query(msg: &NlMessage<'_>) -> Result<Option<String>, ParseError> {
    if msg.header.ty != GENL_ID_CTRL || msg.genl_cmd()? != CTRL_CMD_GETFAMILY {
        return Ok(None);
    }
    for attr in msg.attrs()? {
        let attr = attr?;
        if attr.tag == CTRL_ATTR_FAMILY_NAME {
            return Ok(Some(attr.as_str()?.to_owned()));
        }
    }
    Ok(None)
}

/// Encode a `CTRL_CMD_NEWFAMILY` description answering a lookup.
pub fn encode_family_reply(name: &str, family_id: u16, seq: u32) -> Result<Vec<u8>, EncodeError> {
    let mut reply = RequestBuilder::new(GENL_ID_CTRL, 0, seq, CTRL_CMD_NEWFAMILY, CTRL_VERSION);
    reply.put_str(CTRL_ATTR_FAMILY_NAME, name, "family name")?;
    reply.put_u16(CTRL_ATTR_FAMILY_ID, family_id);
    Ok(reply.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{build_status_frame, MessageIter, NlHeader};

    fn first(frame: &[u8]) -> NlMessage<'_> {
        MessageIter::new(frame).next().unwrap().unwrap()
    }

    #[test]
    fn query_and_reply_round_trip() {
        let query = encode_family_query("MAC80211_HWSIM", 1).unwrap();
        let msg = first(&query);
        assert_eq!(msg.header.ty, GENL_ID_CTRL);
        assert_eq!(msg.header.flags, NLM_F_REQUEST);
        assert_eq!(
            parse_family_query(&msg).unwrap(),
            Some("MAC80211_HWSIM".to_owned())
        );

        let reply = encode_family_reply("MAC80211_HWSIM", 0x21, 1).unwrap();
        let msg = first(&reply);
        assert_eq!(
            parse_family_reply(&msg, 1).unwrap(),
            Some(FamilyReply::Resolved { family_id: 0x21 })
        );
    }

    #[test]
    fn missing_family_maps_to_not_registered() {
        let request = NlHeader {
            len: 0,
            ty: GENL_ID_CTRL,
            flags: NLM_F_REQUEST,
            seq: 1,
            pid: 0,
        };
        let frame = build_status_frame(-ENOENT, &request);
        assert_eq!(
            parse_family_reply(&first(&frame), 1).unwrap(),
            Some(FamilyReply::NotRegistered)
        );

        let refused = build_status_frame(-13, &request);
        assert_eq!(
            parse_family_reply(&first(&refused), 1).unwrap(),
            Some(FamilyReply::Failed { code: -13 })
        );
    }

    #[test]
    fn foreign_sequence_and_acks_say_nothing() {
        let reply = encode_family_reply("MAC80211_HWSIM", 0x21, 5).unwrap();
        assert_eq!(parse_family_reply(&first(&reply), 1).unwrap(), None);

        let request = NlHeader {
            len: 0,
            ty: GENL_ID_CTRL,
            flags: NLM_F_REQUEST,
            seq: 1,
            pid: 0,
        };
        let ack = build_status_frame(0, &request);
        assert_eq!(parse_family_reply(&first(&ack), 1).unwrap(), None);
    }

    #[test]
    fn empty_family_name_is_rejected() {
        assert_eq!(
            encode_family_query("", 1).unwrap_err(),
            EncodeError::EmptyField {
                field: "family name"
            }
        );
    }
}
