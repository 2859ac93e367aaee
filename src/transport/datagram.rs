//! Inbound UDP records.
//!
//! A producer datagram is a 50-byte NUL-padded topic field, one data-type
//! tag byte and up to 1500 payload bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::transport::message::{MAX_TOPIC_LEN, until_nul};
use crate::transport::payload::{MAX_PAYLOAD_LEN, Value, payload_len};
use crate::utils::ProtocolError;

/// Width of the topic field in a datagram.
pub const TOPIC_FIELD_LEN: usize = MAX_TOPIC_LEN;

/// Topic field plus the tag byte.
pub const DATAGRAM_HEADER_LEN: usize = TOPIC_FIELD_LEN + 1;

pub const MAX_DATAGRAM_LEN: usize = DATAGRAM_HEADER_LEN + MAX_PAYLOAD_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub topic: String,
    pub data_type: u8,
    /// Exactly the bytes to forward, sized per `payload_len`.
    pub payload: Bytes,
}

impl Datagram {
    /// Builds the datagram a producer would send for `value`.
    pub fn new(topic: impl Into<String>, value: &Value) -> Self {
        let mut payload = BytesMut::new();
        value.encode(&mut payload);
        Self {
            topic: topic.into(),
            data_type: value.data_type().tag(),
            payload: payload.freeze(),
        }
    }

    pub fn decode(src: &[u8]) -> Result<Self, ProtocolError> {
        if src.len() < DATAGRAM_HEADER_LEN {
            return Err(ProtocolError::DatagramTooShort(src.len()));
        }

        let topic = String::from_utf8(until_nul(&src[..TOPIC_FIELD_LEN]).to_vec())
            .map_err(|_| ProtocolError::InvalidUtf8("topic"))?;
        let data_type = src[TOPIC_FIELD_LEN];
        let raw = &src[DATAGRAM_HEADER_LEN..src.len().min(MAX_DATAGRAM_LEN)];

        // Bytes the sender left out read as zero.
        let len = payload_len(data_type, raw);
        let mut payload = BytesMut::with_capacity(len);
        let present = len.min(raw.len());
        payload.put_slice(&raw[..present]);
        payload.put_bytes(0, len - present);

        Ok(Self {
            topic,
            data_type,
            payload: payload.freeze(),
        })
    }

    /// Wire form: padded topic field, tag, payload.
    pub fn encode(&self) -> Bytes {
        let topic = self.topic.as_bytes();
        let topic = &topic[..topic.len().min(TOPIC_FIELD_LEN)];
        let payload = &self.payload[..self.payload.len().min(MAX_PAYLOAD_LEN)];

        let mut dst = BytesMut::with_capacity(DATAGRAM_HEADER_LEN + payload.len());
        dst.put_slice(topic);
        dst.put_bytes(0, TOPIC_FIELD_LEN - topic.len());
        dst.put_u8(self.data_type);
        dst.put_slice(payload);
        dst.freeze()
    }
}
