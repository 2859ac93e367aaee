use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;

/// Identifier the multiplexer assigns to every accepted TCP connection.
///
/// Identifiers are never reused within one broker run, so a stale id can
/// never address a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Represents an accepted TCP connection in the broker.
///
/// Frames pushed through `sender` are written to the socket, in order, by the
/// connection's writer task.
#[derive(Debug, Clone)]
pub struct Client {
    /// Identifier of the connection.
    pub id: ConnectionId,

    /// Address of the remote peer.
    pub addr: SocketAddr,

    /// Channel to the connection's writer task.
    pub sender: UnboundedSender<Bytes>,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: UnboundedSender<Bytes>) -> Self {
        Self { id, addr, sender }
    }

    /// Queues an encoded frame for the writer task.
    ///
    /// Returns `false` when the writer is gone; the multiplexer learns about
    /// that through the connection's own close event.
    pub fn send(&self, frame: Bytes) -> bool {
        if let Err(e) = self.sender.send(frame) {
            tracing::warn!(connection = %self.id, error = %e, "Failed to queue frame");
            return false;
        }
        true
    }
}
