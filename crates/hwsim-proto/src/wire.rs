//! Netlink wire framing primitives
//!
//! Everything the kernel control channel carries is framed the same way: a
//! fixed 16-byte netlink header, a 4-byte generic-netlink header, then a run
//! of type-length-value attributes. All integers are native-endian and every
//! attribute is padded to a 4-byte boundary.
//!
//! # Frame format
//! ```text
//! | len u32 | type u16 | flags u16 | seq u32 | pid u32 |   netlink header
//! | cmd u8 | version u8 | reserved u16 |                   genl header
//! | nla_len u16 | nla_type u16 | payload ... pad |  ...    attributes
//! ```
//!
//! A received datagram may pack several messages back to back; use
//! [`MessageIter`] to walk them. Error/acknowledgment frames carry an `i32`
//! status code instead of a genl header; 0 acknowledges success, negative
//! values are errnos.

use crate::error::{EncodeError, ParseError};

/// Netlink header length
pub const NLMSG_HDRLEN: usize = 16;
/// Generic netlink header length
pub const GENL_HDRLEN: usize = 4;
/// Attribute header length
pub const NLA_HDRLEN: usize = 4;
/// Alignment of attributes and of messages within a datagram
pub const NL_ALIGNTO: usize = 4;

/// Message type: error/acknowledgment frame
pub const NLMSG_ERROR: u16 = 0x2;
/// Message type: end of a multipart dump
pub const NLMSG_DONE: u16 = 0x3;
/// First message type available to protocol families
pub const NLMSG_MIN_TYPE: u16 = 0x10;

/// Flag: message is a request to the kernel
pub const NLM_F_REQUEST: u16 = 0x1;
/// Flag: acknowledge the request even on success
pub const NLM_F_ACK: u16 = 0x4;

#[inline]
pub(crate) fn align(len: usize) -> usize {
    (len + NL_ALIGNTO - 1) & !(NL_ALIGNTO - 1)
}

/// Parsed netlink message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NlHeader {
    /// Total message length, header included
    pub len: u32,
    /// Message type: a family id or one of the `NLMSG_*` control types
    pub ty: u16,
    pub flags: u16,
    /// Sequence number, copied into replies by the kernel
    pub seq: u32,
    /// Sender port; 0 lets the kernel assign one
    pub pid: u32,
}

impl NlHeader {
    /// Parse a header from the front of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() < NLMSG_HDRLEN {
            return Err(ParseError::Truncated {
                needed: NLMSG_HDRLEN - buf.len(),
            });
        }
        Ok(Self {
            len: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            ty: u16::from_ne_bytes([buf[4], buf[5]]),
            flags: u16::from_ne_bytes([buf[6], buf[7]]),
            seq: u32::from_ne_bytes([buf[8], buf[9], buf[10], buf[11]]),
            pid: u32::from_ne_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    fn emit(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.len.to_ne_bytes());
        buf.extend_from_slice(&self.ty.to_ne_bytes());
        buf.extend_from_slice(&self.flags.to_ne_bytes());
        buf.extend_from_slice(&self.seq.to_ne_bytes());
        buf.extend_from_slice(&self.pid.to_ne_bytes());
    }
}

/// One netlink message viewed inside a received datagram
#[derive(Debug, Clone, Copy)]
pub struct NlMessage<'a> {
    pub header: NlHeader,
    /// Bytes after the netlink header
    pub payload: &'a [u8],
}

impl<'a> NlMessage<'a> {
    /// Generic netlink command byte, for messages that carry a genl header.
    pub fn genl_cmd(&self) -> Result<u8, ParseError> {
        if self.payload.len() < GENL_HDRLEN {
            return Err(ParseError::Truncated {
                needed: GENL_HDRLEN - self.payload.len(),
            });
        }
        Ok(self.payload[0])
    }

    /// Iterate the attributes following the genl header.
    pub fn attrs(&self) -> Result<AttrIter<'a>, ParseError> {
        if self.payload.len() < GENL_HDRLEN {
            return Err(ParseError::Truncated {
                needed: GENL_HDRLEN - self.payload.len(),
            });
        }
        Ok(AttrIter {
            buf: &self.payload[GENL_HDRLEN..],
        })
    }

    /// Read this message as an error/acknowledgment frame.
    pub fn as_status(&self) -> Result<StatusFrame, ParseError> {
        if self.header.ty != NLMSG_ERROR {
            return Err(ParseError::Unexpected("not a status frame"));
        }
        if self.payload.len() < 4 {
            return Err(ParseError::Truncated {
                needed: 4 - self.payload.len(),
            });
        }
        let code = i32::from_ne_bytes([
            self.payload[0],
            self.payload[1],
            self.payload[2],
            self.payload[3],
        ]);
        Ok(StatusFrame { code })
    }
}

/// Embedded status of an error/acknowledgment frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    /// 0 for an acknowledgment, a negative errno otherwise
    pub code: i32,
}

impl StatusFrame {
    /// True when the frame acknowledges success.
    pub fn is_ack(&self) -> bool {
        self.code == 0
    }
}

/// Iterator over the netlink messages packed into one datagram
pub struct MessageIter<'a> {
    buf: &'a [u8],
}

impl<'a> MessageIter<'a> {
    pub fn new(datagram: &'a [u8]) -> Self {
        Self { buf: datagram }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<NlMessage<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        let header = match NlHeader::parse(self.buf) {
            Ok(header) => header,
            Err(e) => {
                self.buf = &[];
                return Some(Err(e));
            }
        };
        let total = header.len as usize;
        if total < NLMSG_HDRLEN {
            self.buf = &[];
            return Some(Err(ParseError::BadLength(header.len)));
        }
        if total > self.buf.len() {
            let needed = total - self.buf.len();
            self.buf = &[];
            return Some(Err(ParseError::Truncated { needed }));
        }
        let payload = &self.buf[NLMSG_HDRLEN..total];
        self.buf = &self.buf[align(total).min(self.buf.len())..];
        Some(Ok(NlMessage { header, payload }))
    }
}

/// One typed attribute
#[derive(Debug, Clone, Copy)]
pub struct Attr<'a> {
    pub tag: u16,
    pub payload: &'a [u8],
}

impl<'a> Attr<'a> {
    pub fn as_u16(&self) -> Result<u16, ParseError> {
        match self.payload {
            [a, b] => Ok(u16::from_ne_bytes([*a, *b])),
            other => Err(ParseError::BadAttributeLength {
                tag: self.tag,
                len: other.len(),
                expected: 2,
            }),
        }
    }

    pub fn as_u32(&self) -> Result<u32, ParseError> {
        match self.payload {
            [a, b, c, d] => Ok(u32::from_ne_bytes([*a, *b, *c, *d])),
            other => Err(ParseError::BadAttributeLength {
                tag: self.tag,
                len: other.len(),
                expected: 4,
            }),
        }
    }

    /// String payload; a trailing NUL, if present, is stripped.
    pub fn as_str(&self) -> Result<&'a str, ParseError> {
        let bytes = self
            .payload
            .strip_suffix(&[0])
            .unwrap_or(self.payload);
        std::str::from_utf8(bytes).map_err(|_| ParseError::BadString { tag: self.tag })
    }
}

/// Iterator over a run of attributes
pub struct AttrIter<'a> {
    buf: &'a [u8],
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<Attr<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        // anything shorter than a header is trailing padding
        if self.buf.len() < NLA_HDRLEN {
            return None;
        }
        let len = u16::from_ne_bytes([self.buf[0], self.buf[1]]) as usize;
        let tag = u16::from_ne_bytes([self.buf[2], self.buf[3]]);
        if len < NLA_HDRLEN || len > self.buf.len() {
            self.buf = &[];
            return Some(Err(ParseError::AttributeOverrun { tag }));
        }
        let payload = &self.buf[NLA_HDRLEN..len];
        self.buf = &self.buf[align(len).min(self.buf.len())..];
        Some(Ok(Attr { tag, payload }))
    }
}

/// Builder for one generic netlink request
///
/// Appends typed attributes in call order and back-patches the total length
/// on [`finish`](Self::finish). Fixed-width appenders cannot fail; string
/// payloads are validated.
pub struct RequestBuilder {
    buf: Vec<u8>,
}

impl RequestBuilder {
    /// Start a request addressed to `family` with the given command byte.
    pub fn new(family: u16, flags: u16, seq: u32, cmd: u8, version: u8) -> Self {
        let mut buf = Vec::with_capacity(64);
        let header = NlHeader {
            len: 0, // patched in finish()
            ty: family,
            flags,
            seq,
            pid: 0,
        };
        header.emit(&mut buf);
        buf.push(cmd);
        buf.push(version);
        buf.extend_from_slice(&0u16.to_ne_bytes());
        Self { buf }
    }

    fn put_fixed(&mut self, tag: u16, payload: &[u8]) {
        let len = NLA_HDRLEN + payload.len();
        self.buf.extend_from_slice(&(len as u16).to_ne_bytes());
        self.buf.extend_from_slice(&tag.to_ne_bytes());
        self.buf.extend_from_slice(payload);
        self.buf.resize(self.buf.len() + (align(len) - len), 0);
    }

    /// Append a u16 attribute.
    pub fn put_u16(&mut self, tag: u16, value: u16) {
        self.put_fixed(tag, &value.to_ne_bytes());
    }

    /// Append a u32 attribute.
    pub fn put_u32(&mut self, tag: u16, value: u32) {
        self.put_fixed(tag, &value.to_ne_bytes());
    }

    /// Append a presence flag: empty payload, present-means-true.
    pub fn put_flag(&mut self, tag: u16) {
        self.put_fixed(tag, &[]);
    }

    /// Append a NUL-terminated string attribute.
    pub fn put_str(&mut self, tag: u16, value: &str, field: &'static str) -> Result<(), EncodeError> {
        if value.as_bytes().contains(&0) {
            return Err(EncodeError::EmbeddedNul { field });
        }
        let len = NLA_HDRLEN + value.len() + 1;
        if len > u16::MAX as usize {
            return Err(EncodeError::Oversize {
                field,
                len: value.len(),
            });
        }
        self.buf.extend_from_slice(&(len as u16).to_ne_bytes());
        self.buf.extend_from_slice(&tag.to_ne_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        self.buf.resize(self.buf.len() + (align(len) - len), 0);
        Ok(())
    }

    /// Patch the length field and hand back the finished frame.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.buf[..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }
}

/// Build an error/acknowledgment frame answering `request`.
///
/// The payload is the status code followed by the original request header,
/// the way the kernel echoes it back. Code 0 acknowledges success.
pub fn build_status_frame(code: i32, request: &NlHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(NLMSG_HDRLEN + 4 + NLMSG_HDRLEN);
    let header = NlHeader {
        len: (NLMSG_HDRLEN + 4 + NLMSG_HDRLEN) as u32,
        ty: NLMSG_ERROR,
        flags: 0,
        seq: request.seq,
        pid: request.pid,
    };
    header.emit(&mut buf);
    buf.extend_from_slice(&code.to_ne_bytes());
    request.emit(&mut buf);
    buf
}
