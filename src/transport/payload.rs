//! Typed payload encodings.
//!
//! | tag | name       | layout                                   |
//! |-----|------------|------------------------------------------|
//! | 0   | INT        | sign byte, u32 magnitude                 |
//! | 1   | SHORT_REAL | u16, hundredths                          |
//! | 2   | FLOAT      | sign byte, u32 magnitude, u8 exponent    |
//! | 3   | STRING     | bytes up to the first NUL                |

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::transport::message::until_nul;
use crate::utils::ProtocolError;

/// Largest payload a datagram or a delivery can carry.
pub const MAX_PAYLOAD_LEN: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    Int = 0,
    ShortReal = 1,
    Float = 2,
    String = 3,
}

impl DataType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Int),
            1 => Some(DataType::ShortReal),
            2 => Some(DataType::Float),
            3 => Some(DataType::String),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::ShortReal => "SHORT_REAL",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
        }
    }

    /// Encoded size for fixed-width types, `None` for STRING.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            DataType::Int => Some(5),
            DataType::ShortReal => Some(2),
            DataType::Float => Some(6),
            DataType::String => None,
        }
    }
}

/// Display name for a raw tag.
pub fn type_name(tag: u8) -> &'static str {
    DataType::from_tag(tag).map_or("UNKNOWN", DataType::name)
}

/// Number of payload bytes to forward for `tag`.
///
/// `raw` is the payload region of a datagram. Fixed-width types do not
/// depend on it; STRING counts the bytes before the first NUL; unknown tags
/// forward nothing.
pub fn payload_len(tag: u8, raw: &[u8]) -> usize {
    match DataType::from_tag(tag) {
        Some(DataType::String) => until_nul(&raw[..raw.len().min(MAX_PAYLOAD_LEN)]).len(),
        Some(fixed) => fixed.fixed_len().unwrap_or(0),
        None => 0,
    }
}

/// A decoded payload value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int {
        negative: bool,
        magnitude: u32,
    },
    /// Hundredths.
    ShortReal(u16),
    /// `magnitude * 10^-exponent`.
    Float {
        negative: bool,
        magnitude: u32,
        exponent: u8,
    },
    String(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int { .. } => DataType::Int,
            Value::ShortReal(_) => DataType::ShortReal,
            Value::Float { .. } => DataType::Float,
            Value::String(_) => DataType::String,
        }
    }

    pub fn decode(data_type: DataType, mut payload: &[u8]) -> Result<Self, ProtocolError> {
        if let Some(expected) = data_type.fixed_len() {
            if payload.len() < expected {
                return Err(ProtocolError::PayloadTooShort {
                    name: data_type.name(),
                    expected,
                    actual: payload.len(),
                });
            }
        }

        Ok(match data_type {
            DataType::Int => Value::Int {
                negative: payload.get_u8() != 0,
                magnitude: payload.get_u32(),
            },
            DataType::ShortReal => Value::ShortReal(payload.get_u16()),
            DataType::Float => Value::Float {
                negative: payload.get_u8() != 0,
                magnitude: payload.get_u32(),
                exponent: payload.get_u8(),
            },
            DataType::String => {
                Value::String(String::from_utf8_lossy(until_nul(payload)).into_owned())
            }
        })
    }

    /// Writes the wire form. STRING writes its bytes without a terminator.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Value::Int {
                negative,
                magnitude,
            } => {
                dst.put_u8(u8::from(*negative));
                dst.put_u32(*magnitude);
            }
            Value::ShortReal(raw) => dst.put_u16(*raw),
            Value::Float {
                negative,
                magnitude,
                exponent,
            } => {
                dst.put_u8(u8::from(*negative));
                dst.put_u32(*magnitude);
                dst.put_u8(*exponent);
            }
            Value::String(text) => dst.put_slice(text.as_bytes()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int {
                negative,
                magnitude,
            } => {
                if *negative && *magnitude != 0 {
                    write!(f, "-")?;
                }
                write!(f, "{magnitude}")
            }
            Value::ShortReal(raw) => {
                let (integral, fractional) = (raw / 100, raw % 100);
                if fractional == 0 {
                    write!(f, "{integral}")
                } else {
                    write!(f, "{integral}.{fractional:02}")
                }
            }
            Value::Float {
                negative,
                magnitude,
                exponent,
            } => {
                if *negative && *magnitude != 0 {
                    write!(f, "-")?;
                }
                let (integral, fractional) = split_decimal(*magnitude, *exponent as usize);
                write!(f, "{integral}")?;
                if fractional.bytes().any(|b| b != b'0') {
                    write!(f, ".{fractional}")?;
                }
                Ok(())
            }
            Value::String(text) => write!(f, "{text}"),
        }
    }
}

/// Splits `magnitude` at `exponent` decimal places; the fractional part is
/// left-padded with zeros to exactly `exponent` digits.
fn split_decimal(magnitude: u32, exponent: usize) -> (String, String) {
    let digits = magnitude.to_string();
    if exponent == 0 {
        return (digits, String::new());
    }
    if digits.len() > exponent {
        let (integral, fractional) = digits.split_at(digits.len() - exponent);
        return (integral.to_string(), fractional.to_string());
    }
    let padding = "0".repeat(exponent - digits.len());
    ("0".to_string(), format!("{padding}{digits}"))
}
