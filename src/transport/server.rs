//! Connection multiplexer
//!
//! A single loop waits on the control input, the TCP listener, the UDP
//! socket and the events of every connection task, and handles whichever is
//! ready to completion before waiting again. The `Broker` lives inside the
//! loop; nothing else mutates it.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::broker::{Broker, LoginOutcome};
use crate::client::ConnectionId;
use crate::transport::connection::{self, ConnectionEvent, ConnectionTasks};
use crate::transport::datagram::MAX_DATAGRAM_LEN;
use crate::transport::message::{ClientRequest, ip_text};
use crate::utils::Result;

/// Control command that stops the broker.
pub const EXIT_COMMAND: &str = "exit";

pub struct Server {
    listener: TcpListener,
    udp: UdpSocket,
    tcp_nodelay: bool,
    broker: Broker,
    connections: HashMap<ConnectionId, ConnectionTasks>,
    next_connection: u64,
    events_tx: UnboundedSender<ConnectionEvent>,
    events_rx: UnboundedReceiver<ConnectionEvent>,
}

impl Server {
    /// Binds the TCP listener on `addr` and the UDP socket on the same port.
    ///
    /// With port 0 the UDP socket takes whatever port the listener got.
    pub async fn bind(addr: SocketAddr, tcp_nodelay: bool) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        let udp = UdpSocket::bind(local).await?;
        tracing::info!(tcp = %local, udp = %udp.local_addr()?, "Broker listening");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            listener,
            udp,
            tcp_nodelay,
            broker: Broker::new(),
            connections: HashMap::new(),
            next_connection: 1,
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Runs until `exit` is read from `control` or a fatal error occurs.
    ///
    /// End of the control input only stops watching it.
    pub async fn run<C>(mut self, control: C) -> Result<()>
    where
        C: AsyncBufRead + Unpin,
    {
        let mut control = ControlLines::new(control);
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

        loop {
            tokio::select! {
                line = control.next_line() => match line? {
                    Some(line) => {
                        if line.split_whitespace().next() == Some(EXIT_COMMAND) {
                            tracing::info!("Exit requested");
                            break;
                        }
                    }
                    None => tracing::debug!("Control input closed"),
                },
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted?;
                    self.on_accept(stream, addr);
                }
                received = self.udp.recv_from(&mut buf) => {
                    let (len, source) = received?;
                    self.on_datagram(&buf[..len], source);
                }
                Some(event) = self.events_rx.recv() => self.on_event(event)?,
            }
        }

        self.shutdown();
        Ok(())
    }

    fn on_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;

        if self.tcp_nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!(connection = %id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let (client, tasks) = connection::spawn(id, stream, addr, self.events_tx.clone());
        self.broker.accept_connection(client);
        self.connections.insert(id, tasks);
    }

    fn on_datagram(&mut self, bytes: &[u8], source: SocketAddr) {
        match self.broker.handle_datagram(bytes, source) {
            Ok(report) => tracing::trace!(%source, ?report, "Datagram handled"),
            Err(e) => tracing::warn!(%source, error = %e, "Dropping datagram"),
        }
    }

    fn on_event(&mut self, event: ConnectionEvent) -> Result<()> {
        match event {
            ConnectionEvent::Request {
                connection,
                request,
            } => {
                // Requests still queued from a connection closed in the meantime.
                if self.connections.contains_key(&connection) {
                    self.on_request(connection, request);
                }
            }
            ConnectionEvent::Closed { connection } => self.on_closed(connection),
            ConnectionEvent::Failed { connection, error } => {
                tracing::error!(%connection, error = %error, "Connection failed");
                return Err(error.into());
            }
        }
        Ok(())
    }

    fn on_request(&mut self, connection: ConnectionId, request: ClientRequest) {
        match request {
            ClientRequest::Login { identity } => self.on_login(connection, &identity),
            ClientRequest::Subscribe {
                topic,
                store_and_forward,
            } => {
                if let Err(e) = self
                    .broker
                    .subscribe(connection, &topic, store_and_forward != 0)
                {
                    tracing::warn!(%connection, %topic, error = %e, "Ignoring subscribe");
                }
            }
            ClientRequest::Unsubscribe { topic } => {
                if let Err(e) = self.broker.unsubscribe(connection, &topic) {
                    tracing::warn!(%connection, %topic, error = %e, "Ignoring unsubscribe");
                }
            }
        }
    }

    fn on_login(&mut self, connection: ConnectionId, identity: &str) {
        match self.broker.login(connection, identity) {
            Ok(LoginOutcome::Rejected) => {
                println!("Client {identity} already connected.");
                self.close(connection);
            }
            Ok(LoginOutcome::Accepted | LoginOutcome::Reattached { .. }) => {
                if let Some(subscriber) = self.broker.registry.lookup_by_identity(identity) {
                    let addr = subscriber.addr();
                    println!(
                        "New client {identity} connected from {}:{}.",
                        ip_text(&addr),
                        addr.port()
                    );
                }
            }
            Err(e) => tracing::warn!(%connection, identity, error = %e, "Ignoring login"),
        }
    }

    fn on_closed(&mut self, connection: ConnectionId) {
        if let Some(tasks) = self.connections.remove(&connection) {
            tasks.close();
        }
        if let Some(identity) = self.broker.disconnect(connection) {
            println!("Client {identity} disconnected.");
        }
    }

    /// Closes a connection the broker refused.
    fn close(&mut self, connection: ConnectionId) {
        if let Some(tasks) = self.connections.remove(&connection) {
            tasks.close();
        }
    }

    fn shutdown(&mut self) {
        let open = self.connections.len();
        for (_, tasks) in self.connections.drain() {
            tasks.close();
        }
        tracing::info!(
            connections = open,
            subscribers = self.broker.registry.len(),
            topics = self.broker.topics.len(),
            "Broker stopped"
        );
    }
}

/// Line reader over a control input.
///
/// Lines that are not valid UTF-8 are decoded lossily. A partial line
/// survives a cancelled `next_line`, and once the input ends every further
/// call pends forever.
pub(crate) struct ControlLines<R> {
    reader: Option<R>,
    pending: Vec<u8>,
}

impl<R> ControlLines<R>
where
    R: AsyncBufRead + Unpin,
{
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            pending: Vec::new(),
        }
    }

    /// Next line, newline included. `None` once, at end of input.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return std::future::pending().await;
        };

        let read = reader.read_until(b'\n', &mut self.pending).await?;
        if read == 0 && self.pending.is_empty() {
            self.reader = None;
            return Ok(None);
        }

        let line = match String::from_utf8(std::mem::take(&mut self.pending)) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(len = e.as_bytes().len(), "Control line is not valid UTF-8");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(Some(line))
    }
}
