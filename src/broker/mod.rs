pub mod engine;
pub mod message;
pub mod registry;
pub mod subscriber;
pub mod topic;

pub use engine::{Broker, FanoutReport};
pub use registry::{LoginOutcome, SubscriberRegistry};
pub use subscriber::{Subscriber, SubscriberId};
