//! `tokio_util` codecs for the two TCP directions.
//!
//! `RequestCodec` only frames requests; body decoding is left to the caller
//! so a malformed body costs one frame rather than the whole stream.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::broker::message::Message;
use crate::transport::message::{
    CONTENT_HEADER_LEN, ClientRequest, ContentHeader, MAX_REQUEST_BODY_LEN, MAX_TOPIC_LEN,
    REQUEST_HEADER_LEN, RequestHeader,
};
use crate::transport::payload::MAX_PAYLOAD_LEN;
use crate::utils::{Error, ProtocolError};

/// One framed client request, body still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub kind: u8,
    pub body: Bytes,
}

impl RequestFrame {
    pub fn decode(&self) -> Result<ClientRequest, ProtocolError> {
        ClientRequest::decode(self.kind, &self.body)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestCodec;

impl Decoder for RequestCodec {
    type Item = RequestFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header) = RequestHeader::peek(&src[..]) else {
            return Ok(None);
        };
        if header.length as usize > MAX_REQUEST_BODY_LEN {
            return Err(ProtocolError::FrameTooLarge(header.length).into());
        }

        let total = REQUEST_HEADER_LEN + header.length as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(REQUEST_HEADER_LEN);
        let body = src.split_to(header.length as usize).freeze();
        Ok(Some(RequestFrame {
            kind: header.kind,
            body,
        }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = self.decode(buf)?;
        if frame.is_none() && !buf.is_empty() {
            tracing::debug!(remaining = buf.len(), "Peer closed mid-request");
            buf.clear();
        }
        Ok(frame)
    }
}

impl Encoder<ClientRequest> for RequestCodec {
    type Error = Error;

    fn encode(&mut self, item: ClientRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

/// Decodes deliveries on the consumer side.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentCodec;

impl Decoder for ContentCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header) = ContentHeader::decode(&src[..]) else {
            return Ok(None);
        };
        if header.topic_len as usize > MAX_TOPIC_LEN {
            return Err(ProtocolError::InvalidTopic(header.topic_len as usize).into());
        }
        if header.data_len as usize > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(header.data_len).into());
        }

        let topic_len = header.topic_len as usize;
        let data_len = header.data_len as usize;
        let total = CONTENT_HEADER_LEN + topic_len + data_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(CONTENT_HEADER_LEN);
        let topic = String::from_utf8_lossy(&src.split_to(topic_len)).into_owned();
        let payload = src.split_to(data_len).freeze();
        Ok(Some(Message {
            header,
            topic,
            payload,
        }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let message = self.decode(buf)?;
        if message.is_none() && !buf.is_empty() {
            tracing::debug!(remaining = buf.len(), "Server closed mid-delivery");
            buf.clear();
        }
        Ok(message)
    }
}

impl Encoder<&Message> for ContentCodec {
    type Error = Error;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst);
        Ok(())
    }
}
