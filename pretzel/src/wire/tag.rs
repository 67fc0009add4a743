use derive_more::{Deref, From};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};

/// One tag byte: value-kind bits 2..=3 over basic-encoding bits 0..=1.
/// Bits 4..=7 are unassigned and ignored by both extractors.
#[derive(From, Deref, PartialEq, Eq, Clone, Copy, Debug)]
pub struct TagByte(u8);

impl TagByte {
    pub fn new(kind: RecordKind, basic: BasicEncoding) -> Self {
        let int = (kind.to_u8().unwrap() << 2) | basic.to_u8().unwrap();
        Self(int)
    }

    pub fn kind(&self) -> RecordKind {
        // A two-bit field; every value maps to a member.
        RecordKind::from_u8((self.0 >> 2) & 0b11).unwrap()
    }

    pub fn basic(&self) -> BasicEncoding {
        BasicEncoding::from_u8(self.0 & 0b11).unwrap()
    }
}

/// Value kind carried in tag bits 2..=3. Discriminants are the on-wire bit
/// values.
///
/// For `Int` and `Link` the record's basic body is the value itself; for
/// `Bytes` and `Compose` it is a byte length, and that many payload bytes
/// follow the body.
#[repr(u8)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, FromPrimitive, ToPrimitive, Debug)]
pub enum RecordKind {
    Bytes = 0,
    Compose = 1,
    Int = 2,
    Link = 3,
}

impl RecordKind {
    pub fn is_length_prefixed(&self) -> bool {
        matches!(self, Self::Bytes | Self::Compose)
    }
}

/// Basic-encoding form carried in tag bits 0..=1. Discriminants are the
/// on-wire bit values.
#[repr(u8)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, FromPrimitive, ToPrimitive, Debug)]
pub enum BasicEncoding {
    Fixed64 = 0,
    Fixed32 = 1,
    VarPos = 2,
    VarNeg = 3,
}
