//! # Postbox
//!
//! `postbox` is a topic broker bridging UDP producers and TCP consumers.
//! Producers fire typed datagrams at a topic; consumers log in with a stable
//! identity, subscribe to topics and receive every matching message while
//! connected. Store-and-forward subscriptions keep what a consumer missed
//! and replay it when the same identity logs in again.
//!
//! ## Core Modules
//!
//! - `broker`: subscriber registry, topic directory and the fan-out engine.
//! - `client`: the broker's handle on one TCP connection.
//! - `config`: loads settings from `config/default` and `POSTBOX_*` variables.
//! - `consumer`: command parsing, delivery rendering and the consumer session.
//! - `transport`: wire codecs, connection tasks and the multiplexing server.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod consumer;
pub mod transport;
pub mod utils;
