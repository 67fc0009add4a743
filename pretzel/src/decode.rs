use crate::ds_n_a::identity_tree::{IdentityTree, KeyOrder};
use crate::error::{PretzelError, Result};
use crate::identity::{ObjId, ObjShared, Position};
use crate::wire::{decode_basic, RecordKind, TagByte};
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

struct DecodeRecord<'buf> {
    kind: RecordKind,
    value: u64,
    payload: Option<&'buf [u8]>,
}

/// Parses a whole byte slice into records up front. Any malformed tail,
/// a tag without a body, a truncated basic form, or a length prefix that
/// overruns the input, fails the parse as [`PretzelError::Eof`].
fn parse_records(input: &[u8]) -> Result<VecDeque<DecodeRecord<'_>>> {
    let mut records = VecDeque::new();
    let mut at = 0usize;
    while at < input.len() {
        let tag = TagByte::from(input[at]);
        let kind = tag.kind();
        at += 1;

        let (value, head_len) = decode_basic(tag.basic(), &input[at..])?;
        at += head_len;

        let payload = match kind.is_length_prefixed() {
            false => None,
            true => {
                let len = usize::try_from(value).map_err(|_| PretzelError::Eof)?;
                let end = at.checked_add(len).ok_or(PretzelError::Eof)?;
                let slice = input.get(at..end).ok_or(PretzelError::Eof)?;
                at = end;
                Some(slice)
            }
        };

        records.push_back(DecodeRecord {
            kind,
            value,
            payload,
        });
    }
    Ok(records)
}

/// A Decoder walks a previously materialized byte stream record by record.
///
/// ### API:
///
/// [`Self::load`] parses the whole input eagerly; the typed `read_*`
/// operations then consume records head-first. A read that fails because the
/// head record has the wrong kind leaves the record in place, so the caller
/// may probe with one reader and fall back to another. [`Self::read_struct`]
/// rebuilds composites behind `Rc<RefCell<T>>` handles and resolves link
/// records to the handles of already-decoded composites, reproducing shared
/// and cyclic object graphs.
///
/// ### Internals:
///
/// Records borrow their payload slices from the input buffer. Handles are
/// tracked in an [`IdentityTree`] ordered by position; a composite's handle
/// is registered *before* its fields are decoded, so a link back to an
/// ancestor composite resolves mid-decode and cycles terminate. While a
/// composite's callback runs, the decoder's record sequence is swapped for
/// the records parsed out of that composite's payload.
pub struct Decoder<'buf> {
    records: VecDeque<DecodeRecord<'buf>>,
    tree: IdentityTree,
}

impl<'buf> Decoder<'buf> {
    pub fn load(input: &'buf [u8]) -> Result<Self> {
        let records = parse_records(input)?;
        Ok(Self {
            records,
            tree: IdentityTree::new(KeyOrder::ByPosition),
        })
    }

    /// Count of records not yet consumed at the current nesting level.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn head(&self) -> Result<&DecodeRecord<'buf>> {
        self.records.front().ok_or(PretzelError::Eof)
    }

    /// Consumes one integer record and returns its value.
    pub fn read_u64(&mut self) -> Result<u64> {
        let record = self.head()?;
        if record.kind != RecordKind::Int {
            return Err(PretzelError::TypeMismatch);
        }
        let value = record.value;
        self.records.pop_front();
        Ok(value)
    }

    /// Narrowing readers consume the record first and range-check second;
    /// an out-of-range value fails with [`PretzelError::Overflow`] but is
    /// still consumed.
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.read_u64()?;
        u32::try_from(value).map_err(|_| PretzelError::Overflow)
    }
    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self.read_u64()?;
        u16::try_from(value).map_err(|_| PretzelError::Overflow)
    }
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.read_u64()?;
        u8::try_from(value).map_err(|_| PretzelError::Overflow)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }
    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self.read_i64()?;
        i32::try_from(value).map_err(|_| PretzelError::Overflow)
    }
    pub fn read_i16(&mut self) -> Result<i16> {
        let value = self.read_i64()?;
        i16::try_from(value).map_err(|_| PretzelError::Overflow)
    }
    pub fn read_i8(&mut self) -> Result<i8> {
        let value = self.read_i64()?;
        i8::try_from(value).map_err(|_| PretzelError::Overflow)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    fn head_payload(&self, expected: RecordKind) -> Result<&'buf [u8]> {
        let record = self.head()?;
        if record.kind != expected {
            return Err(PretzelError::TypeMismatch);
        }
        record.payload.ok_or(PretzelError::NullPayload)
    }

    /// Copies a byte-string payload into `dest` and consumes the record.
    /// A payload longer than `dest` is truncated to fit; the byte count
    /// actually copied is returned.
    pub fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        let payload = self.head_payload(RecordKind::Bytes)?;
        let len = payload.len().min(dest.len());
        dest[..len].copy_from_slice(&payload[..len]);
        self.records.pop_front();
        Ok(len)
    }

    /// The whole byte-string payload as one owned buffer.
    pub fn read_byte_buf(&mut self) -> Result<Vec<u8>> {
        let payload = self.head_payload(RecordKind::Bytes)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(payload.len())?;
        buf.extend_from_slice(payload);
        self.records.pop_front();
        Ok(buf)
    }

    /// A byte-string payload as owned UTF-8 text. The record is consumed
    /// even when validation fails.
    pub fn read_string(&mut self) -> Result<String> {
        let buf = self.read_byte_buf()?;
        let text = String::from_utf8(buf)?;
        Ok(text)
    }

    /// Consumes one composite or link record and returns a shared handle to
    /// the decoded object.
    ///
    /// On a composite, `new_obj` constructs the blank object, the handle is
    /// registered at the next position, and `decode_fields` fills the fields
    /// in by reading from the composite's own record sequence. Registration
    /// happens before `decode_fields` runs, so a link among the fields may
    /// resolve to this very object and cyclic graphs rebuild correctly. If
    /// `decode_fields` fails, the composite record is left unconsumed.
    ///
    /// On a link, the already-registered handle at the linked position is
    /// returned, or [`PretzelError::NullPayload`] if nothing was registered
    /// there; either way the link record is consumed. A handle of a type
    /// other than `T` fails with [`PretzelError::TypeMismatch`].
    pub fn read_struct<T, New, Fields>(
        &mut self,
        new_obj: New,
        decode_fields: Fields,
    ) -> Result<Rc<RefCell<T>>>
    where
        T: Any,
        New: FnOnce() -> T,
        Fields: FnOnce(&mut T, &mut Decoder<'buf>) -> Result<()>,
    {
        let record = self.head()?;
        match record.kind {
            RecordKind::Link => {
                let pos = Position::from(record.value);
                self.records.pop_front();
                let shared = self
                    .tree
                    .find_by_position(pos)
                    .ok_or(PretzelError::NullPayload)?;
                shared
                    .downcast::<RefCell<T>>()
                    .map_err(|_| PretzelError::TypeMismatch)
            }
            RecordKind::Compose => {
                let payload = record.payload.ok_or(PretzelError::NullPayload)?;

                let pos = Position::from(self.tree.len() + 1);
                let obj = Rc::new(RefCell::new(new_obj()));
                let shared: ObjShared = obj.clone();
                self.tree.insert(ObjId::of_rc(&shared), pos, Some(shared));

                let nested = parse_records(payload)?;
                let parent_records = mem::replace(&mut self.records, nested);
                let res = {
                    let mut fields = obj.borrow_mut();
                    decode_fields(&mut *fields, self)
                };
                self.records = parent_records;
                res?;

                self.records.pop_front();
                Ok(obj)
            }
            _ => Err(PretzelError::TypeMismatch),
        }
    }

    /// Consumes one composite or link record without decoding any fields.
    /// The payload is parsed for well-formedness and discarded. A skipped
    /// composite still claims its position, registered with an absent
    /// handle, so a later link to that position fails with
    /// [`PretzelError::NullPayload`]. Composites nested inside the
    /// discarded payload claim nothing; the positions they held on the
    /// encode side are claimed by whatever composites are decoded next,
    /// and links into the skipped interior resolve to those later objects.
    pub fn skip_struct(&mut self) -> Result<()> {
        let record = self.head()?;
        match record.kind {
            RecordKind::Link => {
                self.records.pop_front();
                Ok(())
            }
            RecordKind::Compose => {
                let payload = record.payload.ok_or(PretzelError::NullPayload)?;

                let pos = Position::from(self.tree.len() + 1);
                self.tree.insert(ObjId::ABSENT, pos, None);

                parse_records(payload)?;
                self.records.pop_front();
                Ok(())
            }
            _ => Err(PretzelError::TypeMismatch),
        }
    }
}
