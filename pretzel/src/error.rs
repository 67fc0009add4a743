use std::collections::TryReserveError;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Failure taxonomy shared by every fallible codec operation.
///
/// A kind mismatch against the head record leaves the record unconsumed,
/// so callers may probe with one reader and fall back to another.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PretzelError {
    /// A record promised an object or payload and carried none: a
    /// length-prefixed record without data, or a link to a position with no
    /// materialized object behind it.
    #[error("record carries no payload")]
    NullPayload,

    #[error("payload allocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    /// The head record's kind does not match the requested read, or a linked
    /// object is not of the requested type.
    #[error("record does not match the requested read")]
    TypeMismatch,

    /// Input ended mid-record, or a read was issued past the last record.
    #[error("unexpected end of input")]
    Eof,

    /// A decoded magnitude does not fit the requested width, or a varint
    /// body accumulated past 64 bits.
    #[error("value does not fit the requested width")]
    Overflow,

    #[error("byte-string payload is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, PretzelError>;
