//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `postbox` binaries.
//!
//! It centralizes the error types shared by the codec, the broker engine and
//! the processes, plus the tracing setup both binaries call at startup.

pub mod error;
pub mod logging;

pub use error::{BrokerError, Error, ProtocolError, Result};

#[cfg(test)]
mod tests;
