use std::collections::VecDeque;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::broker::message::{Message, StoredMessage};
use crate::client::{Client, ConnectionId};

pub type SubscriberId = String;

/// A TCP consumer known to the broker.
///
/// Starts provisional (no identity) when its connection is accepted and is
/// named by a successful login. A named subscriber outlives its connections:
/// while detached it keeps its store-and-forward queue.
#[derive(Debug)]
pub struct Subscriber {
    identity: Option<SubscriberId>,
    addr: SocketAddr,
    client: Option<Client>,
    stored: VecDeque<StoredMessage>,
}

impl Subscriber {
    /// Creates the provisional entry for a freshly accepted connection.
    pub fn provisional(client: Client) -> Self {
        Self {
            identity: None,
            addr: client.addr,
            client: Some(client),
            stored: VecDeque::new(),
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub(crate) fn set_identity(&mut self, identity: SubscriberId) {
        self.identity = Some(identity);
    }

    /// Address of the most recent connection.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        self.client.as_ref().map(|c| c.id)
    }

    pub(crate) fn attach(&mut self, client: Client) {
        self.addr = client.addr;
        self.client = Some(client);
    }

    pub(crate) fn detach(&mut self) -> Option<Client> {
        self.client.take()
    }

    /// Sends an encoded frame if connected.
    pub fn deliver(&self, frame: Bytes) -> bool {
        match &self.client {
            Some(client) => client.send(frame),
            None => false,
        }
    }

    /// Appends to the store-and-forward queue.
    pub fn enqueue(&mut self, message: Message) {
        self.stored.push_back(StoredMessage::new(message));
    }

    pub fn pending(&self) -> usize {
        self.stored.len()
    }

    pub fn stored(&self) -> impl Iterator<Item = &StoredMessage> {
        self.stored.iter()
    }

    /// Sends every queued message in arrival order and empties the queue.
    ///
    /// A detached subscriber keeps its queue. Returns how many messages were
    /// handed to the connection.
    pub(crate) fn flush(&mut self) -> usize {
        let Some(client) = &self.client else {
            return 0;
        };

        if let Some(oldest) = self.stored.front() {
            tracing::debug!(
                connection = %client.id,
                count = self.stored.len(),
                oldest = %oldest.queued_at,
                "Replaying stored messages"
            );
        }

        let mut replayed = 0;
        for stored in self.stored.drain(..) {
            client.send(stored.message.encode());
            replayed += 1;
        }
        replayed
    }
}
