//! Subscriber registry
//!
//! Tracks provisional entries by connection and named subscribers by
//! identity, with a second index from live connection to identity so both
//! lookups are O(1).

use std::collections::HashMap;

use crate::broker::subscriber::{Subscriber, SubscriberId};
use crate::client::{Client, ConnectionId};
use crate::utils::BrokerError;

/// Result of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The provisional entry became a new named subscriber.
    Accepted,
    /// A disconnected subscriber took over the connection; `replayed` stored
    /// messages were flushed to it.
    Reattached { replayed: usize },
    /// The identity is held by a connected subscriber. The provisional entry
    /// has been discarded and the connection must be closed.
    Rejected,
}

#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: HashMap<SubscriberId, Subscriber>,
    provisional: HashMap<ConnectionId, Subscriber>,
    connections: HashMap<ConnectionId, SubscriberId>,
}

impl SubscriberRegistry {
    /// Creates the provisional entry for a new connection.
    pub fn accept_connection(&mut self, client: Client) -> &Subscriber {
        let id = client.id;
        self.provisional
            .entry(id)
            .insert_entry(Subscriber::provisional(client))
            .into_mut()
    }

    pub fn login(
        &mut self,
        connection: ConnectionId,
        identity: &str,
    ) -> Result<LoginOutcome, BrokerError> {
        if let Some(current) = self.connections.get(&connection) {
            return Err(BrokerError::AlreadyLoggedIn {
                connection,
                identity: current.clone(),
            });
        }
        let Some(mut shell) = self.provisional.remove(&connection) else {
            return Err(BrokerError::UnknownConnection(connection));
        };

        match self.subscribers.get_mut(identity) {
            Some(existing) if existing.is_connected() => Ok(LoginOutcome::Rejected),
            Some(existing) => {
                if let Some(client) = shell.detach() {
                    existing.attach(client);
                }
                self.connections.insert(connection, identity.to_string());
                let replayed = existing.flush();
                Ok(LoginOutcome::Reattached { replayed })
            }
            None => {
                shell.set_identity(identity.to_string());
                self.connections.insert(connection, identity.to_string());
                self.subscribers.insert(identity.to_string(), shell);
                Ok(LoginOutcome::Accepted)
            }
        }
    }

    /// Detaches the connection from its subscriber.
    ///
    /// Returns the named subscriber that went offline; a provisional entry is
    /// simply discarded.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<&Subscriber> {
        match self.connections.remove(&connection) {
            Some(identity) => {
                let subscriber = self.subscribers.get_mut(&identity)?;
                subscriber.detach();
                Some(subscriber)
            }
            None => {
                self.provisional.remove(&connection);
                None
            }
        }
    }

    pub fn lookup_by_handle(&self, connection: ConnectionId) -> Option<&Subscriber> {
        match self.connections.get(&connection) {
            Some(identity) => self.subscribers.get(identity),
            None => self.provisional.get(&connection),
        }
    }

    pub fn lookup_by_identity(&self, identity: &str) -> Option<&Subscriber> {
        self.subscribers.get(identity)
    }

    pub(crate) fn get_mut(&mut self, identity: &str) -> Option<&mut Subscriber> {
        self.subscribers.get_mut(identity)
    }

    /// Identity of a logged-in connection.
    pub fn identity_of(&self, connection: ConnectionId) -> Result<&SubscriberId, BrokerError> {
        match self.connections.get(&connection) {
            Some(identity) => Ok(identity),
            None if self.provisional.contains_key(&connection) => {
                Err(BrokerError::NotLoggedIn(connection))
            }
            None => Err(BrokerError::UnknownConnection(connection)),
        }
    }

    /// Number of named subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn provisional_len(&self) -> usize {
        self.provisional.len()
    }
}
