use crate::ds_n_a::identity_tree::{IdentityTree, KeyOrder};
use crate::error::Result;
use crate::identity::{ObjId, Position};
use crate::wire::{encode_basic, RecordKind, TagByte, BASIC_MAX_LEN};
use std::mem;

struct EncodeRecord {
    tag: TagByte,
    payload: Vec<u8>,
}

/// An Encoder accumulates an ordered, append-only sequence of tagged records
/// and linearizes them on demand.
///
/// ### API:
///
/// Typed `write_*` operations append one record each. [`Self::write_struct`]
/// appends a composite record whose payload is everything a caller-supplied
/// callback writes; an identity written twice in one encode (including
/// through a cycle) becomes a link record instead of a second serialization.
/// [`Self::size`] and [`Self::materialize`] expose the byte stream.
///
/// ### Internals:
///
/// Identities are tracked in an [`IdentityTree`] ordered by identity; a
/// composite is registered at the next position *before* its callback runs,
/// so self-references terminate. During a callback the encoder's record
/// sequence is swapped for the nested one, which on success is spliced into
/// the parent as a single length-prefixed payload.
pub struct Encoder {
    records: Vec<EncodeRecord>,
    size: u64,
    tree: IdentityTree,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            size: 0,
            tree: IdentityTree::new(KeyOrder::ByIdentity),
        }
    }

    /// Count of records appended so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total serialized byte length so far, tag bytes included.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Linearizes the record sequence into `dest`, one tag byte plus payload
    /// per record, each at its absolute stream offset. Records starting below
    /// `offset` are skipped with their bytes in `dest` left untouched, and
    /// the walk stops before the first record that would cross `dest.len()`.
    /// Returns the byte count laid down past `offset`, which is assumed to
    /// lie on a record boundary.
    pub fn materialize(&self, dest: &mut [u8], offset: u64) -> u64 {
        let mut at = 0u64;
        for record in &self.records {
            let len = 1 + record.payload.len() as u64;
            if at + len > dest.len() as u64 {
                break;
            }
            if at >= offset {
                let start = at as usize;
                dest[start] = *record.tag;
                dest[start + 1..start + len as usize].copy_from_slice(&record.payload);
            }
            at += len;
        }
        at.saturating_sub(offset)
    }

    /// The whole stream as one owned buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.size as usize];
        self.materialize(&mut buf, 0);
        buf
    }

    /// Appends one integer record carrying `value`.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.push_record(RecordKind::Int, value, &[])
    }
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u64(value as u64)
    }
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_u64(value as u64)
    }
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_u64(value as u64)
    }

    /// Signed writers sign-extend to 64 bits. The width is not recorded on
    /// the wire; reading back with a compatible width is the caller's
    /// contract.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_u64(value as u64)
    }
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_i64(value as i64)
    }
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_i64(value as i64)
    }
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_i64(value as i64)
    }

    /// Floats are carried as their integer bit pattern.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_u64(value.to_bits())
    }
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u64(value.to_bits() as u64)
    }

    /// Appends one byte-string record copying `bytes`.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.push_record(RecordKind::Bytes, bytes.len() as u64, bytes)
    }

    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())
    }

    fn write_link(&mut self, pos: Position) -> Result<()> {
        self.push_record(RecordKind::Link, *pos, &[])
    }

    /// Appends one composite record for `obj`, or a link record if an object
    /// with the same identity was already written during this top-level
    /// encode.
    ///
    /// `encode_fields` receives `obj` back along with the encoder, whose
    /// record sequence is the nested one while the callback runs; everything
    /// it writes becomes this record's payload. The identity is registered
    /// before `encode_fields` runs, so a field that refers back to `obj`
    /// (directly or transitively) encodes as a link and recursion terminates
    /// on cycles.
    pub fn write_struct<T, Fields>(&mut self, obj: &T, encode_fields: Fields) -> Result<()>
    where
        T: ?Sized,
        Fields: FnOnce(&T, &mut Encoder) -> Result<()>,
    {
        let id = ObjId::of(obj);
        if let Some(pos) = self.tree.find_by_identity(id) {
            return self.write_link(pos);
        }
        let pos = Position::from(self.tree.len() + 1);
        self.tree.insert(id, pos, None);

        let parent_records = mem::take(&mut self.records);
        let parent_size = mem::take(&mut self.size);
        let res = encode_fields(obj, self);
        let nested_records = mem::replace(&mut self.records, parent_records);
        let nested_size = mem::replace(&mut self.size, parent_size);
        res?;

        self.splice_nested(nested_records, nested_size)
    }

    fn push_record(&mut self, kind: RecordKind, value: u64, data: &[u8]) -> Result<()> {
        let mut head = [0u8; BASIC_MAX_LEN];
        let (basic, head_len) = encode_basic(value, &mut head);

        let mut payload = Vec::new();
        payload.try_reserve_exact(head_len + data.len())?;
        payload.extend_from_slice(&head[..head_len]);
        payload.extend_from_slice(data);

        self.size += 1 + payload.len() as u64;
        self.records.push(EncodeRecord {
            tag: TagByte::new(kind, basic),
            payload,
        });
        Ok(())
    }

    /// Appends the compose record carrying a completed nested sequence as its
    /// length-prefixed payload.
    fn splice_nested(&mut self, records: Vec<EncodeRecord>, nested_size: u64) -> Result<()> {
        let mut head = [0u8; BASIC_MAX_LEN];
        let (basic, head_len) = encode_basic(nested_size, &mut head);

        let mut payload = Vec::new();
        payload.try_reserve_exact(head_len + nested_size as usize)?;
        payload.extend_from_slice(&head[..head_len]);
        for record in &records {
            payload.push(*record.tag);
            payload.extend_from_slice(&record.payload);
        }

        self.size += 1 + payload.len() as u64;
        self.records.push(EncodeRecord {
            tag: TagByte::new(RecordKind::Compose, basic),
            payload,
        });
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;

    #[test]
    fn empty_encoder() {
        let enc = Encoder::new();
        assert_eq!(enc.size(), 0);
        assert!(enc.is_empty());
        assert!(enc.to_vec().is_empty());
    }

    #[test]
    fn golden_scalar_and_bytes_stream() -> Result<()> {
        let mut enc = Encoder::new();
        enc.write_u64(42)?;
        enc.write_bytes(b"hi")?;

        assert_eq!(enc.len(), 2);
        assert_eq!(enc.size(), 6);
        assert_eq!(enc.to_vec(), vec![0x0A, 0x2A, 0x02, 0x02, 0x68, 0x69]);
        Ok(())
    }

    #[test]
    fn materialize_respects_capacity_and_offset() -> Result<()> {
        let mut enc = Encoder::new();
        enc.write_u64(42)?; // 2 bytes at 0..2
        enc.write_bytes(b"hi")?; // 4 bytes at 2..6

        // Capacity below the second record: only the first is laid down.
        let mut buf = [0xAAu8; 5];
        assert_eq!(enc.materialize(&mut buf, 0), 2);
        assert_eq!(buf, [0x0A, 0x2A, 0xAA, 0xAA, 0xAA]);

        // A record-aligned offset writes the tail at absolute offsets.
        let mut buf = [0u8; 6];
        assert_eq!(enc.materialize(&mut buf, 2), 4);
        assert_eq!(buf, [0, 0, 0x02, 0x02, 0x68, 0x69]);

        // An offset beyond every record saturates to zero bytes written.
        let mut buf = [0u8; 6];
        assert_eq!(enc.materialize(&mut buf, 32), 0);
        assert_eq!(buf, [0u8; 6]);
        Ok(())
    }

    #[test]
    fn size_inside_a_callback_reports_the_nested_stream() -> Result<()> {
        let mut enc = Encoder::new();
        enc.write_u64(7)?;
        enc.write_struct(&1u8, |_, enc| {
            assert_eq!(enc.size(), 0);
            enc.write_u64(300)?;
            assert_eq!(enc.size(), 3);
            Ok(())
        })?;
        // Tag, one length byte, three nested bytes.
        assert_eq!(enc.size(), 2 + 5);
        Ok(())
    }

    #[test]
    fn size_tracks_tag_and_payload_bytes() -> Result<()> {
        let mut enc = Encoder::new();
        enc.write_u64(300)?; // tag + 2 varint bytes
        assert_eq!(enc.size(), 3);
        enc.write_u64(0xFFFF_FFFF)?; // tag + fixed-32
        assert_eq!(enc.size(), 8);
        enc.write_bytes(&[0; 5])?; // tag + length byte + 5
        assert_eq!(enc.size(), 15);
        assert_eq!(enc.to_vec().len() as u64, enc.size());
        Ok(())
    }
}
