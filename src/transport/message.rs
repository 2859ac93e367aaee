//! TCP frame layouts.
//!
//! Client to server: a 5-byte request header (`type`, `length`) followed by
//! `length` body bytes. Server to client: a 27-byte content header followed by
//! the topic bytes and the payload bytes. Integers are big-endian.

use std::net::SocketAddr;

use bytes::{Buf, BufMut, BytesMut};

use crate::utils::ProtocolError;

/// Meaningful characters in a subscriber identity.
pub const MAX_IDENTITY_LEN: usize = 10;

/// Meaningful characters in a topic title.
pub const MAX_TOPIC_LEN: usize = 50;

pub const REQUEST_HEADER_LEN: usize = 5;

/// Largest body a valid request carries (subscribe: flag + topic + NUL).
pub const MAX_REQUEST_BODY_LEN: usize = MAX_TOPIC_LEN + 2;

/// Width of the NUL-padded source IP field in a content header.
pub const IP_FIELD_LEN: usize = 16;

pub const CONTENT_HEADER_LEN: usize = 4 + 4 + IP_FIELD_LEN + 2 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    Login = 0,
    Subscribe = 1,
    Unsubscribe = 2,
}

impl TryFrom<u8> for RequestKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RequestKind::Login),
            1 => Ok(RequestKind::Subscribe),
            2 => Ok(RequestKind::Unsubscribe),
            other => Err(ProtocolError::UnknownRequestType(other)),
        }
    }
}

/// Fixed-size prefix of every client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Raw type byte; unknown values are kept so the body can be skipped.
    pub kind: u8,
    /// Number of body bytes that follow.
    pub length: u32,
}

impl RequestHeader {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.kind);
        dst.put_u32(self.length);
    }

    /// Reads a header from the front of `src` without consuming it.
    pub fn peek(src: &[u8]) -> Option<Self> {
        if src.len() < REQUEST_HEADER_LEN {
            return None;
        }
        let mut buf = &src[..REQUEST_HEADER_LEN];
        let kind = buf.get_u8();
        let length = buf.get_u32();
        Some(Self { kind, length })
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Login { identity: String },
    /// `store_and_forward` is the raw flag byte; any non-zero value enables it.
    Subscribe { topic: String, store_and_forward: u8 },
    Unsubscribe { topic: String },
}

impl ClientRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ClientRequest::Login { .. } => RequestKind::Login,
            ClientRequest::Subscribe { .. } => RequestKind::Subscribe,
            ClientRequest::Unsubscribe { .. } => RequestKind::Unsubscribe,
        }
    }

    /// Body length as announced in the request header.
    pub fn body_len(&self) -> usize {
        match self {
            ClientRequest::Login { identity } => identity.len() + 1,
            ClientRequest::Subscribe { topic, .. } => topic.len() + 2,
            ClientRequest::Unsubscribe { topic } => topic.len() + 1,
        }
    }

    /// Writes header and body.
    pub fn encode(&self, dst: &mut BytesMut) {
        let length = self.body_len();
        dst.reserve(REQUEST_HEADER_LEN + length);
        RequestHeader {
            kind: self.kind() as u8,
            length: length as u32,
        }
        .encode(dst);

        match self {
            ClientRequest::Login { identity } => {
                dst.put_slice(identity.as_bytes());
                dst.put_u8(0);
            }
            ClientRequest::Subscribe {
                topic,
                store_and_forward,
            } => {
                dst.put_u8(*store_and_forward);
                dst.put_slice(topic.as_bytes());
                dst.put_u8(0);
            }
            ClientRequest::Unsubscribe { topic } => {
                dst.put_slice(topic.as_bytes());
                dst.put_u8(0);
            }
        }
    }

    /// Decodes a request body of the given raw type.
    pub fn decode(kind: u8, body: &[u8]) -> Result<Self, ProtocolError> {
        match RequestKind::try_from(kind)? {
            RequestKind::Login => {
                let identity = until_nul(body);
                if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
                    return Err(ProtocolError::InvalidIdentity(identity.len()));
                }
                Ok(ClientRequest::Login {
                    identity: utf8(identity, "identity")?,
                })
            }
            RequestKind::Subscribe => {
                if body.len() < 2 {
                    return Err(ProtocolError::BodyTooShort {
                        expected: 2,
                        actual: body.len(),
                    });
                }
                Ok(ClientRequest::Subscribe {
                    store_and_forward: body[0],
                    topic: topic(&body[1..])?,
                })
            }
            RequestKind::Unsubscribe => Ok(ClientRequest::Unsubscribe {
                topic: topic(body)?,
            }),
        }
    }
}

/// Metadata preceding every delivery to a TCP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHeader {
    pub data_len: u32,
    pub topic_len: u32,
    /// Dotted IPv4 text of the publisher, at most 15 characters.
    pub source_ip: String,
    pub source_port: u16,
    pub data_type: u8,
}

impl ContentHeader {
    pub fn new(
        data_len: usize,
        topic_len: usize,
        source: SocketAddr,
        data_type: u8,
    ) -> Result<Self, ProtocolError> {
        let ip = ip_text(&source);
        if ip.len() >= IP_FIELD_LEN {
            return Err(ProtocolError::AddressTooLong(ip));
        }

        Ok(Self {
            data_len: data_len as u32,
            topic_len: topic_len as u32,
            source_ip: ip,
            source_port: source.port(),
            data_type,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(CONTENT_HEADER_LEN);
        dst.put_u32(self.data_len);
        dst.put_u32(self.topic_len);
        let ip = self.source_ip.as_bytes();
        let ip = &ip[..ip.len().min(IP_FIELD_LEN - 1)];
        dst.put_slice(ip);
        dst.put_bytes(0, IP_FIELD_LEN - ip.len());
        dst.put_u16(self.source_port);
        dst.put_u8(self.data_type);
    }

    /// Decodes a header from the first `CONTENT_HEADER_LEN` bytes of `src`.
    pub fn decode(src: &[u8]) -> Option<Self> {
        if src.len() < CONTENT_HEADER_LEN {
            return None;
        }
        let mut buf = &src[..CONTENT_HEADER_LEN];
        let data_len = buf.get_u32();
        let topic_len = buf.get_u32();
        let source_ip = String::from_utf8_lossy(until_nul(&buf[..IP_FIELD_LEN])).into_owned();
        buf.advance(IP_FIELD_LEN);
        let source_port = buf.get_u16();
        let data_type = buf.get_u8();

        Some(Self {
            data_len,
            topic_len,
            source_ip,
            source_port,
            data_type,
        })
    }
}

/// Dotted text of an address, unwrapping IPv4-mapped IPv6 addresses.
pub fn ip_text(addr: &SocketAddr) -> String {
    match addr {
        SocketAddr::V4(v4) => v4.ip().to_string(),
        SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.ip().to_string(),
        },
    }
}

/// Bytes of a C-style field up to (not including) the first NUL.
pub(crate) fn until_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

fn utf8(bytes: &[u8], what: &'static str) -> Result<String, ProtocolError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(what))
}

fn topic(field: &[u8]) -> Result<String, ProtocolError> {
    let title = until_nul(field);
    if title.is_empty() || title.len() > MAX_TOPIC_LEN {
        return Err(ProtocolError::InvalidTopic(title.len()));
    }
    utf8(title, "topic")
}
