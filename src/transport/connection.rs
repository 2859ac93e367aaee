//! Per-connection tasks.
//!
//! Each accepted socket is split in two. The reader task frames requests and
//! forwards them, in order, to the multiplexer; the writer task drains the
//! connection's outbound queue onto the socket. Neither touches broker state.

use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};

use crate::client::{Client, ConnectionId};
use crate::transport::codec::RequestCodec;
use crate::transport::message::ClientRequest;
use crate::utils::Error;

/// What a connection task reports to the multiplexer.
#[derive(Debug)]
pub enum ConnectionEvent {
    Request {
        connection: ConnectionId,
        request: ClientRequest,
    },
    /// The peer went away, or sent something that cannot be framed.
    Closed { connection: ConnectionId },
    /// A transport error other than a peer closure.
    Failed {
        connection: ConnectionId,
        error: io::Error,
    },
}

/// Handles to the tasks serving one connection.
#[derive(Debug)]
pub struct ConnectionTasks {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ConnectionTasks {
    /// Stops both tasks; the socket closes once both halves are dropped.
    pub fn close(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Starts the reader and writer tasks for an accepted socket.
pub fn spawn(
    id: ConnectionId,
    stream: TcpStream,
    addr: SocketAddr,
    events: UnboundedSender<ConnectionEvent>,
) -> (Client, ConnectionTasks) {
    let (read, write) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();

    let reader = tokio::spawn(read_loop(id, read, events.clone()));
    let writer = tokio::spawn(write_loop(id, write, rx, events));

    (Client::new(id, addr, tx), ConnectionTasks { reader, writer })
}

/// Resets and broken pipes are how peers usually vanish; they are closures,
/// not failures.
pub fn is_peer_closure(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

async fn read_loop(
    connection: ConnectionId,
    read: OwnedReadHalf,
    events: UnboundedSender<ConnectionEvent>,
) {
    let mut frames = FramedRead::new(read, RequestCodec);

    let event = loop {
        match frames.next().await {
            Some(Ok(frame)) => match frame.decode() {
                Ok(request) => {
                    if events
                        .send(ConnectionEvent::Request {
                            connection,
                            request,
                        })
                        .is_err()
                    {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(%connection, kind = frame.kind, error = %e, "Skipping malformed request");
                }
            },
            Some(Err(Error::Io(error))) if !is_peer_closure(&error) => {
                break ConnectionEvent::Failed { connection, error };
            }
            Some(Err(Error::Io(_))) | None => break ConnectionEvent::Closed { connection },
            Some(Err(e)) => {
                tracing::warn!(%connection, error = %e, "Dropping connection");
                break ConnectionEvent::Closed { connection };
            }
        }
    };

    let _ = events.send(event);
}

async fn write_loop(
    connection: ConnectionId,
    write: OwnedWriteHalf,
    mut outbound: UnboundedReceiver<Bytes>,
    events: UnboundedSender<ConnectionEvent>,
) {
    let mut sink = FramedWrite::new(write, BytesCodec::new());

    while let Some(frame) = outbound.recv().await {
        if let Err(error) = sink.send(frame).await {
            if is_peer_closure(&error) {
                // The reader reports the closure.
                tracing::debug!(%connection, error = %error, "Peer gone while writing");
            } else {
                let _ = events.send(ConnectionEvent::Failed { connection, error });
            }
            return;
        }
    }

    tracing::trace!(%connection, "Outbound queue closed");
}
