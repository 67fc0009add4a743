use crate::error::{PretzelError, Result};
use crate::wire::BasicEncoding;

/// Most bytes a basic body can occupy: ten 7-bit groups cover 64 bits.
pub const BASIC_MAX_LEN: usize = 10;

/// Byte count of the base-128 varint form of `value`.
pub fn varint_len(value: u64) -> usize {
    match value {
        0 => 1,
        _ => (70 - value.leading_zeros() as usize) / 7,
    }
}

/// Writes the shortest basic form of `value` into `buf`, returning the form
/// chosen and its byte count.
///
/// Priority: var-pos if strictly shorter than the fixed form, else var-neg
/// (the varint of the value's two's-complement negation, capturing small
/// negative numbers stored as wide unsigned values), else the fixed 4-byte
/// little-endian form when the value fits 32 bits, else the fixed 8-byte
/// form. The choice is a pure function of `value`, so a magnitude has exactly
/// one encoding.
pub fn encode_basic(value: u64, buf: &mut [u8; BASIC_MAX_LEN]) -> (BasicEncoding, usize) {
    let fixed_len = match value >> 32 {
        0 => 4,
        _ => 8,
    };
    if varint_len(value) < fixed_len {
        (BasicEncoding::VarPos, write_varint(value, buf))
    } else if varint_len(value.wrapping_neg()) < fixed_len {
        (BasicEncoding::VarNeg, write_varint(value.wrapping_neg(), buf))
    } else if fixed_len == 4 {
        buf[..4].copy_from_slice(&(value as u32).to_le_bytes());
        (BasicEncoding::Fixed32, 4)
    } else {
        buf[..8].copy_from_slice(&value.to_le_bytes());
        (BasicEncoding::Fixed64, 8)
    }
}

fn write_varint(mut value: u64, buf: &mut [u8; BASIC_MAX_LEN]) -> usize {
    let mut len = 0;
    while value > 0x7F {
        buf[len] = (value as u8 & 0x7F) | 0x80;
        len += 1;
        value >>= 7;
    }
    buf[len] = value as u8;
    len + 1
}

/// Reads one basic body of the given form off the front of `input`,
/// returning the magnitude and the bytes consumed.
pub fn decode_basic(basic: BasicEncoding, input: &[u8]) -> Result<(u64, usize)> {
    match basic {
        BasicEncoding::Fixed64 => {
            let bytes = input.get(..8).ok_or(PretzelError::Eof)?;
            Ok((u64::from_le_bytes(bytes.try_into().unwrap()), 8))
        }
        BasicEncoding::Fixed32 => {
            let bytes = input.get(..4).ok_or(PretzelError::Eof)?;
            Ok((u32::from_le_bytes(bytes.try_into().unwrap()) as u64, 4))
        }
        BasicEncoding::VarPos | BasicEncoding::VarNeg => {
            let (magnitude, len) = read_varint(input)?;
            let value = match basic {
                BasicEncoding::VarNeg => magnitude.wrapping_neg(),
                _ => magnitude,
            };
            Ok((value, len))
        }
    }
}

fn read_varint(input: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut len = 0usize;
    loop {
        let byte = *input.get(len).ok_or(PretzelError::Eof)?;
        let group = (byte & 0x7F) as u64;
        if shift > 63 || (shift == 63 && group > 1) {
            return Err(PretzelError::Overflow);
        }
        value |= group << shift;
        len += 1;
        if byte & 0x80 == 0 {
            return Ok((value, len));
        }
        shift += 7;
    }
}
