use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::transport::datagram::Datagram;
use crate::transport::message::{CONTENT_HEADER_LEN, ContentHeader};
use crate::utils::ProtocolError;

/// A published message as delivered to TCP clients.
///
/// Built once per datagram and shared by every subscription the fan-out
/// reaches; `payload` is reference-counted so clones are cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: ContentHeader,
    pub topic: String,
    pub payload: Bytes,
}

impl Message {
    /// Builds the outbound message for a datagram received from `source`.
    pub fn from_datagram(datagram: Datagram, source: SocketAddr) -> Result<Self, ProtocolError> {
        let header = ContentHeader::new(
            datagram.payload.len(),
            datagram.topic.len(),
            source,
            datagram.data_type,
        )?;
        Ok(Self {
            header,
            topic: datagram.topic,
            payload: datagram.payload,
        })
    }

    /// Content header, topic bytes, payload bytes.
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode_into(&mut dst);
        dst.freeze()
    }

    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(CONTENT_HEADER_LEN + self.topic.len() + self.payload.len());
        self.header.encode(dst);
        dst.put_slice(self.topic.as_bytes());
        dst.put_slice(&self.payload);
    }
}

/// A message held for a disconnected store-and-forward subscriber.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub message: Message,
    pub queued_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            queued_at: Utc::now(),
        }
    }
}
