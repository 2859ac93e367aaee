//! The `transport` module is responsible for network communication with
//! consumers and producers.
//!
//! It defines the binary wire protocol (request frames, content frames, typed
//! payloads and producer datagrams), the per-connection reader and writer
//! tasks, and the multiplexer loop that forwards decoded traffic to the
//! broker.

pub mod codec;
pub mod connection;
pub mod datagram;
pub mod message;
pub mod payload;
pub mod server;

pub use server::Server;
