//! The `client` module defines the broker-side handle of a TCP connection.
//!
//! It provides the `Client` struct, which encapsulates one accepted
//! connection: its identifier, the peer address and the channel feeding the
//! connection's writer task.

pub mod pubsub_client;
pub use pubsub_client::{Client, ConnectionId};

#[cfg(test)]
mod tests;
