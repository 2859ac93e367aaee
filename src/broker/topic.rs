//! Topic management
//!
//! A `Topic` holds the ordered subscriptions for one title. Topics are
//! created by the first subscribe that names them and are never removed,
//! even once empty.

use std::collections::HashMap;

use crate::broker::subscriber::SubscriberId;

/// Pairs a subscriber with a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscriber: SubscriberId,
    pub store_and_forward: bool,
}

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscriptions: Vec<Subscription>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscriptions: Vec::new(),
        }
    }

    /// Add a subscription, or update the flag of an existing one.
    ///
    /// Returns `true` when a new subscription was created.
    pub fn subscribe(&mut self, id: SubscriberId, store_and_forward: bool) -> bool {
        match self.subscriptions.iter_mut().find(|s| s.subscriber == id) {
            Some(existing) => {
                existing.store_and_forward = store_and_forward;
                false
            }
            None => {
                self.subscriptions.push(Subscription {
                    subscriber: id,
                    store_and_forward,
                });
                true
            }
        }
    }

    /// Remove a subscriber's subscription. Returns `false` if there was none.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        match self.subscriptions.iter().position(|s| s.subscriber == id) {
            Some(index) => {
                self.subscriptions.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn subscription(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.subscriber == id)
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

/// Maps titles to topics.
#[derive(Debug, Default)]
pub struct TopicDirectory {
    topics: HashMap<String, Topic>,
}

impl TopicDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `id` to `title`, creating the topic if needed.
    pub fn subscribe(&mut self, title: &str, id: SubscriberId, store_and_forward: bool) -> bool {
        self.topics
            .entry(title.to_string())
            .or_insert_with(|| Topic::new(title))
            .subscribe(id, store_and_forward)
    }

    /// If the topic does not exist, it will not perform any action.
    pub fn unsubscribe(&mut self, title: &str, id: &str) -> bool {
        self.topics
            .get_mut(title)
            .is_some_and(|topic| topic.unsubscribe(id))
    }

    pub fn get(&self, title: &str) -> Option<&Topic> {
        self.topics.get(title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.topics.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
