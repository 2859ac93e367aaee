//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - binding connections to subscriber identities (login, reattach, reject)
//! - managing topics and their subscriptions
//! - fanning published datagrams out to connected subscribers
//! - queueing messages for disconnected store-and-forward subscribers
//!
//! The engine does no I/O of its own. Deliveries are handed to each
//! connection's outbound channel, so every call returns without waiting on a
//! socket. It is owned by the multiplexer loop and needs no locking.

use std::net::SocketAddr;

use crate::broker::message::Message;
use crate::broker::registry::{LoginOutcome, SubscriberRegistry};
use crate::broker::subscriber::SubscriberId;
use crate::broker::topic::TopicDirectory;
use crate::client::{Client, ConnectionId};
use crate::transport::datagram::Datagram;
use crate::utils::{BrokerError, ProtocolError};

/// What one publish did, per subscription.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub queued: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct Broker {
    pub registry: SubscriberRegistry,
    pub topics: TopicDirectory,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provisional subscriber for a new connection.
    pub fn accept_connection(&mut self, client: Client) {
        tracing::debug!(connection = %client.id, peer = %client.addr, "Connection accepted");
        self.registry.accept_connection(client);
    }

    pub fn login(
        &mut self,
        connection: ConnectionId,
        identity: &str,
    ) -> Result<LoginOutcome, BrokerError> {
        let outcome = self.registry.login(connection, identity)?;
        tracing::debug!(%connection, identity, ?outcome, "Login processed");
        Ok(outcome)
    }

    /// Marks the subscriber behind `connection` as disconnected.
    ///
    /// Returns its identity if it had logged in.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<SubscriberId> {
        let identity = self
            .registry
            .disconnect(connection)
            .and_then(|s| s.identity().map(str::to_string));
        tracing::debug!(%connection, ?identity, "Connection detached");
        identity
    }

    /// Subscribes the connection's subscriber to a topic. Automatically
    /// creates the topic if it doesn't exist; a repeated call updates the
    /// store-and-forward flag.
    pub fn subscribe(
        &mut self,
        connection: ConnectionId,
        topic: &str,
        store_and_forward: bool,
    ) -> Result<(), BrokerError> {
        let identity = self.registry.identity_of(connection)?.clone();
        let created = self.topics.subscribe(topic, identity.clone(), store_and_forward);
        tracing::debug!(%identity, topic, store_and_forward, created, "Subscribed");
        Ok(())
    }

    /// Removes the subscription if it exists. Returns whether one was removed.
    pub fn unsubscribe(&mut self, connection: ConnectionId, topic: &str) -> Result<bool, BrokerError> {
        let identity = self.registry.identity_of(connection)?;
        let removed = self.topics.unsubscribe(topic, identity);
        tracing::debug!(%identity, topic, removed, "Unsubscribed");
        Ok(removed)
    }

    /// Decodes a producer datagram and publishes it.
    pub fn handle_datagram(
        &mut self,
        bytes: &[u8],
        source: SocketAddr,
    ) -> Result<FanoutReport, ProtocolError> {
        let datagram = Datagram::decode(bytes)?;
        let message = Message::from_datagram(datagram, source)?;
        Ok(self.publish(message))
    }

    /// Fans a message out to every subscription of its topic, in
    /// subscription order. Unknown topics drop the message.
    pub fn publish(&mut self, message: Message) -> FanoutReport {
        let mut report = FanoutReport::default();
        let Some(topic) = self.topics.get(&message.topic) else {
            tracing::trace!(topic = %message.topic, "No such topic, dropping");
            return report;
        };

        let frame = message.encode();
        for subscription in &topic.subscriptions {
            let Some(subscriber) = self.registry.get_mut(&subscription.subscriber) else {
                tracing::warn!(identity = %subscription.subscriber, "Subscription without subscriber");
                report.dropped += 1;
                continue;
            };

            if subscriber.is_connected() {
                if subscriber.deliver(frame.clone()) {
                    report.delivered += 1;
                } else {
                    report.dropped += 1;
                }
            } else if subscription.store_and_forward {
                subscriber.enqueue(message.clone());
                report.queued += 1;
            } else {
                report.dropped += 1;
            }
        }

        tracing::trace!(topic = %message.topic, ?report, "Published");
        report
    }
}
