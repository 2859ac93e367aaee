//! Consumer side of the broker protocol.
//!
//! Parses the control commands typed at a subscriber and renders the
//! deliveries it receives. `session` drives both over one TCP connection.

pub mod session;

use crate::broker::message::Message;
use crate::transport::message::{ClientRequest, MAX_TOPIC_LEN};
use crate::transport::payload::{DataType, Value, type_name};
use crate::utils::{Error, ProtocolError};

pub use session::run;

/// A control command read from the consumer's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `subscribe <topic> <sf>`; `flag` is the sf argument as `atoi` reads it.
    Subscribe { topic: String, flag: i32 },
    /// `unsubscribe <topic>`
    Unsubscribe { topic: String },
    /// `exit`
    Exit,
}

impl Command {
    /// Parses one input line.
    ///
    /// Blank lines, unknown commands and commands missing an argument yield
    /// `Ok(None)`. Topics longer than the protocol allows are an error.
    pub fn parse(line: &str) -> Result<Option<Self>, Error> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some("exit") => Command::Exit,
            Some("subscribe") => {
                let (Some(topic), Some(flag)) = (words.next(), words.next()) else {
                    return Ok(None);
                };
                Command::Subscribe {
                    topic: checked_topic(topic)?,
                    flag: atoi(flag),
                }
            }
            Some("unsubscribe") => {
                let Some(topic) = words.next() else {
                    return Ok(None);
                };
                Command::Unsubscribe {
                    topic: checked_topic(topic)?,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// The request this command sends, if any.
    ///
    /// The sf flag is sent as its low byte, whatever its value.
    pub fn to_request(&self) -> Option<ClientRequest> {
        match self {
            Command::Subscribe { topic, flag } => Some(ClientRequest::Subscribe {
                topic: topic.clone(),
                store_and_forward: *flag as u8,
            }),
            Command::Unsubscribe { topic } => Some(ClientRequest::Unsubscribe {
                topic: topic.clone(),
            }),
            Command::Exit => None,
        }
    }
}

fn checked_topic(topic: &str) -> Result<String, Error> {
    if topic.len() > MAX_TOPIC_LEN {
        return Err(Error::Usage(format!(
            "Topics can have at most {MAX_TOPIC_LEN} characters"
        )));
    }
    Ok(topic.to_string())
}

/// Leading optional sign and decimal digits; anything else reads as 0.
fn atoi(text: &str) -> i32 {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, d| {
            acc.wrapping_mul(10).wrapping_add(i32::from(d - b'0'))
        });
    if negative { value.wrapping_neg() } else { value }
}

/// Formats a delivery as `<ip>:<port> - <topic> - <TYPE> - <value>`.
///
/// Unknown tags render as `UNKNOWN` with an empty value.
pub fn render(message: &Message) -> Result<String, ProtocolError> {
    let header = &message.header;
    let value = match DataType::from_tag(header.data_type) {
        Some(data_type) => Value::decode(data_type, &message.payload)?.to_string(),
        None => String::new(),
    };
    Ok(format!(
        "{}:{} - {} - {} - {}",
        header.source_ip,
        header.source_port,
        message.topic,
        type_name(header.data_type),
        value
    ))
}

#[cfg(test)]
mod tests;
