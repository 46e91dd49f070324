//! Unified error channel for both codecs and the RPC layer.
//!
//! The C++ original mixes thrown `CponReader::ParseException`s with plain
//! `bool`/status-code return paths. This crate unifies on one [`Error`] type
//! returned from every codec entry point,
//! with a dedicated [`Error::Eof`] variant for "not a failure, just need more
//! bytes" (see the `Unpack` contract in `reader.rs`, shared by
//! `chainpack::reader` and `cpon::reader`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Byte source was exhausted mid-item. Not a hard failure: callers
    /// buffer more bytes and retry the same decode from the start.
    #[error("end of input, more bytes needed")]
    Eof,

    #[error("malformed input at offset {offset}: {message}")]
    Malformed { message: String, offset: usize },

    #[error("unknown type byte: {0:#04x}")]
    UnknownTypeByte(u8),

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("invalid escape sequence")]
    InvalidEscape,

    #[error("maximum recursion depth exceeded")]
    RecursionLimitExceeded,

    #[error("array elements of type {0} cannot be serialized")]
    UnsupportedArrayType(&'static str),

    #[error("unknown RPC protocol version: {0}")]
    UnknownProtocolVersion(u8),

    #[error("login failed: {0}")]
    Login(String),

    #[error("invalid UTF-8 in string data")]
    InvalidUtf8,

    /// A strict-mode writer's refusal to serialize an `Invalid` value.
    /// Lenient (default) writers never return this; they serialize
    /// `Invalid` as `Null` instead.
    #[error("refusing to serialize an Invalid value in strict mode")]
    InvalidValueRejected,
}

impl Error {
    pub fn malformed(message: impl Into<String>, offset: usize) -> Error {
        Error::Malformed { message: message.into(), offset }
    }
}
