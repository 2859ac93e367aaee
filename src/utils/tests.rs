use super::error::{BrokerError, ProtocolError};
use super::logging;
use crate::client::ConnectionId;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
    assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
}

#[test]
fn errors_render_their_limits() {
    assert_eq!(
        ProtocolError::FrameTooLarge(900).to_string(),
        "request body of 900 bytes exceeds the 52 byte limit"
    );
    assert_eq!(
        ProtocolError::InvalidIdentity(12).to_string(),
        "identity must be 1 to 10 characters, got 12"
    );
    assert_eq!(
        BrokerError::NotLoggedIn(ConnectionId(7)).to_string(),
        "connection #7 has not logged in"
    );
}
