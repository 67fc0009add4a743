//! The wire format.
//!
//! A serialized stream is a flat sequence of records:
//!
//! ```text
//! record := tag_byte basic_body payload?
//!
//! tag_byte bits:
//!     0..=1  basic encoding    00=fixed-64  01=fixed-32  10=var-pos  11=var-neg
//!     2..=3  value kind        00=bytes     01=compose   10=int      11=link
//!     4..=7  unassigned, ignored
//!
//! basic_body:
//!     fixed-64    8 bytes, little-endian
//!     fixed-32    4 bytes, little-endian
//!     var-pos     base-128 groups, low 7 bits first, high bit = continuation
//!     var-neg     var-pos form of the magnitude's two's-complement negation
//! ```
//!
//! For `int` and `link` kinds the basic body *is* the value: an integer, or
//! the 1-based position of an earlier composite record. For `bytes` and
//! `compose` kinds it is a byte length, and that many payload bytes follow:
//! raw caller bytes for `bytes`, a nested record sequence for `compose`.

mod basic;
mod tag;

pub use basic::*;
pub use tag::*;
