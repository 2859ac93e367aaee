//! The `error` module defines the error types used within `postbox`.
//!
//! Errors are split by layer: `ProtocolError` for anything the wire codec
//! refuses, `BrokerError` for engine calls that do not fit the current
//! registry state, and `Error` for what a process can die from.

use thiserror::Error;

use crate::client::ConnectionId;
use crate::transport::message::{MAX_IDENTITY_LEN, MAX_REQUEST_BODY_LEN, MAX_TOPIC_LEN};
use crate::transport::payload::MAX_PAYLOAD_LEN;

/// Errors raised while framing or decoding wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Request body length exceeds anything a valid request can carry
    #[error("request body of {0} bytes exceeds the {MAX_REQUEST_BODY_LEN} byte limit")]
    FrameTooLarge(u32),

    /// Request type byte is not login, subscribe or unsubscribe
    #[error("unknown request type {0}")]
    UnknownRequestType(u8),

    /// Body is shorter than its request type requires
    #[error("request body too short: expected at least {expected} bytes, got {actual}")]
    BodyTooShort { expected: usize, actual: usize },

    /// Identity is empty or longer than the protocol allows
    #[error("identity must be 1 to {MAX_IDENTITY_LEN} characters, got {0}")]
    InvalidIdentity(usize),

    /// Topic is empty or longer than the protocol allows
    #[error("topic must be 1 to {MAX_TOPIC_LEN} characters, got {0}")]
    InvalidTopic(usize),

    /// A text field is not valid UTF-8
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// UDP datagram cannot hold the topic field and the type tag
    #[error("datagram of {0} bytes is too short")]
    DatagramTooShort(usize),

    /// Delivery announces more payload bytes than the protocol allows
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD_LEN} byte limit")]
    PayloadTooLarge(u32),

    /// Payload is shorter than its data type requires
    #[error("{name} payload needs {expected} bytes, got {actual}")]
    PayloadTooShort {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Source address text does not fit the content header
    #[error("source address {0} does not fit the content header")]
    AddressTooLong(String),
}

/// Errors raised by broker engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No subscriber entry is bound to this connection
    #[error("no subscriber is bound to connection {0}")]
    UnknownConnection(ConnectionId),

    /// The connection already completed a login
    #[error("connection {connection} is already logged in as {identity}")]
    AlreadyLoggedIn {
        connection: ConnectionId,
        identity: String,
    },

    /// The connection has not completed a login yet
    #[error("connection {0} has not logged in")]
    NotLoggedIn(ConnectionId),
}

/// Process-level errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Socket or stream failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Wire data could not be decoded
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid command-line input
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
