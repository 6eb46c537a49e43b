// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounds-checked, zero-copy flatbuffer reader
//!
//! Only the subset of the wire format TFLite uses: tables with vtables,
//! scalar fields, strings, and vectors of scalars or tables. Every read is
//! checked against the buffer, so hostile input yields `CorruptReason`
//! instead of a panic.

use crate::error::CorruptReason;

type Result<T> = core::result::Result<T, CorruptReason>;

const UOFFSET_SIZE: usize = 4;

fn read_bytes<const W: usize>(buf: &[u8], pos: usize) -> Result<[u8; W]> {
    pos.checked_add(W)
        .and_then(|end| buf.get(pos..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(CorruptReason::OutOfBounds {
            position: pos,
            len: buf.len(),
        })
}

pub(crate) fn read_u16(buf: &[u8], pos: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(read_bytes(buf, pos)?))
}

pub(crate) fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(read_bytes(buf, pos)?))
}

pub(crate) fn read_i32(buf: &[u8], pos: usize) -> Result<i32> {
    Ok(i32::from_le_bytes(read_bytes(buf, pos)?))
}

pub(crate) fn read_u64(buf: &[u8], pos: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(read_bytes(buf, pos)?))
}

/// Follow the uoffset stored at `pos`
fn follow(buf: &[u8], pos: usize) -> Result<usize> {
    let offset = read_u32(buf, pos)? as usize;
    let target = pos.checked_add(offset).ok_or(CorruptReason::OutOfBounds {
        position: pos,
        len: buf.len(),
    })?;
    if target >= buf.len() {
        return Err(CorruptReason::OutOfBounds {
            position: target,
            len: buf.len(),
        });
    }
    Ok(target)
}

/// Root table of a finished buffer
pub(crate) fn root(buf: &[u8]) -> Result<Table<'_>> {
    if buf.len() < 2 * UOFFSET_SIZE {
        return Err(CorruptReason::TooSmall { len: buf.len() });
    }
    Table::at(buf, follow(buf, 0)?)
}

/// File identifier (bytes 4..8), when the buffer is large enough
pub(crate) fn identifier(buf: &[u8]) -> Option<[u8; 4]> {
    read_bytes(buf, UOFFSET_SIZE).ok()
}

/// A flatbuffer table
#[derive(Debug, Clone, Copy)]
pub(crate) struct Table<'a> {
    buf: &'a [u8],
    pos: usize,
    vtable: usize,
    vtable_len: usize,
}

impl<'a> Table<'a> {
    pub(crate) fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let soffset = read_i32(buf, pos)? as i64;
        let vtable = pos as i64 - soffset;
        if vtable < 0 || vtable as usize >= buf.len() {
            return Err(CorruptReason::BadVtable { table: pos });
        }
        let vtable = vtable as usize;
        let vtable_len = read_u16(buf, vtable)? as usize;
        if vtable_len < 4 || vtable_len % 2 != 0 || vtable + vtable_len > buf.len() {
            return Err(CorruptReason::BadVtable { table: pos });
        }
        let table_len = read_u16(buf, vtable + 2)? as usize;
        if pos + table_len > buf.len() {
            return Err(CorruptReason::BadVtable { table: pos });
        }
        Ok(Self {
            buf,
            pos,
            vtable,
            vtable_len,
        })
    }

    /// Absolute position of field `slot`, `None` if absent
    pub(crate) fn field(&self, slot: usize) -> Result<Option<usize>> {
        let entry = 4 + 2 * slot;
        if entry + 2 > self.vtable_len {
            return Ok(None);
        }
        match read_u16(self.buf, self.vtable + entry)? {
            0 => Ok(None),
            offset => Ok(Some(self.pos + offset as usize)),
        }
    }

    pub(crate) fn u32_or(&self, slot: usize, default: u32) -> Result<u32> {
        match self.field(slot)? {
            Some(pos) => read_u32(self.buf, pos),
            None => Ok(default),
        }
    }

    pub(crate) fn i32_or(&self, slot: usize, default: i32) -> Result<i32> {
        match self.field(slot)? {
            Some(pos) => read_i32(self.buf, pos),
            None => Ok(default),
        }
    }

    pub(crate) fn i8_or(&self, slot: usize, default: i8) -> Result<i8> {
        match self.field(slot)? {
            Some(pos) => Ok(read_bytes::<1>(self.buf, pos)?[0] as i8),
            None => Ok(default),
        }
    }

    pub(crate) fn u64_or(&self, slot: usize, default: u64) -> Result<u64> {
        match self.field(slot)? {
            Some(pos) => read_u64(self.buf, pos),
            None => Ok(default),
        }
    }

    pub(crate) fn bool_or(&self, slot: usize, default: bool) -> Result<bool> {
        Ok(self.i8_or(slot, default as i8)? != 0)
    }

    pub(crate) fn vector(&self, slot: usize) -> Result<Option<Vector<'a>>> {
        match self.field(slot)? {
            Some(pos) => Ok(Some(Vector::at(self.buf, follow(self.buf, pos)?)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn string(&self, slot: usize) -> Result<Option<&'a str>> {
        match self.vector(slot)? {
            Some(vector) => {
                let bytes = vector.bytes(1)?;
                core::str::from_utf8(bytes)
                    .map(Some)
                    .map_err(|_| CorruptReason::InvalidUtf8)
            }
            None => Ok(None),
        }
    }
}

/// A flatbuffer vector (length-prefixed)
#[derive(Debug, Clone, Copy)]
pub(crate) struct Vector<'a> {
    buf: &'a [u8],
    start: usize,
    len: usize,
}

impl<'a> Vector<'a> {
    fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let len = read_u32(buf, pos)? as usize;
        Ok(Self {
            buf,
            start: pos + UOFFSET_SIZE,
            len,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw element bytes, checked for `elem_size`-wide elements
    pub(crate) fn bytes(&self, elem_size: usize) -> Result<&'a [u8]> {
        let end = self
            .len
            .checked_mul(elem_size)
            .and_then(|size| self.start.checked_add(size))
            .ok_or(CorruptReason::OutOfBounds {
                position: self.start,
                len: self.buf.len(),
            })?;
        self.buf.get(self.start..end).ok_or(CorruptReason::OutOfBounds {
            position: end,
            len: self.buf.len(),
        })
    }

    /// Position of 4-byte element `index`
    fn element(&self, index: usize, what: &'static str) -> Result<usize> {
        if index >= self.len {
            return Err(CorruptReason::IndexOutOfRange {
                what,
                index,
                len: self.len,
            });
        }
        // Lengths come from the buffer, so this can overflow a 32-bit usize
        index
            .checked_mul(UOFFSET_SIZE)
            .and_then(|offset| self.start.checked_add(offset))
            .ok_or(CorruptReason::OutOfBounds {
                position: self.start,
                len: self.buf.len(),
            })
    }

    pub(crate) fn table(&self, index: usize, what: &'static str) -> Result<Table<'a>> {
        let pos = self.element(index, what)?;
        Table::at(self.buf, follow(self.buf, pos)?)
    }

    pub(crate) fn i32(&self, index: usize, what: &'static str) -> Result<i32> {
        read_i32(self.buf, self.element(index, what)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_small() {
        assert_eq!(
            root(&[0u8; 4]).unwrap_err(),
            CorruptReason::TooSmall { len: 4 }
        );
    }

    #[test]
    fn test_root_offset_out_of_bounds() {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            root(&buf),
            Err(CorruptReason::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_bad_vtable() {
        // Root at 8, soffset points before the buffer start
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&8u32.to_le_bytes());
        buf[8..12].copy_from_slice(&64i32.to_le_bytes());
        assert_eq!(root(&buf).unwrap_err(), CorruptReason::BadVtable { table: 8 });
    }

    #[test]
    fn test_minimal_table_reads_defaults() {
        // [root=12][pad][vtable: len 6, tbl 8, field0 @4][table: soffset 4, u32 7]
        let mut buf = [0u8; 20];
        buf[0..4].copy_from_slice(&12u32.to_le_bytes());
        buf[6..8].copy_from_slice(&6u16.to_le_bytes());
        buf[8..10].copy_from_slice(&8u16.to_le_bytes());
        buf[10..12].copy_from_slice(&4u16.to_le_bytes());
        buf[12..16].copy_from_slice(&6i32.to_le_bytes());
        buf[16..20].copy_from_slice(&7u32.to_le_bytes());
        let table = root(&buf).unwrap();
        assert_eq!(table.u32_or(0, 0).unwrap(), 7);
        assert_eq!(table.u32_or(1, 42).unwrap(), 42);
        assert!(table.vector(2).unwrap().is_none());
    }

    #[test]
    fn test_vtable_after_table() {
        // [root=8][id][table: soffset -8, u32 7][vtable: len 6, tbl 8, field0 @4]
        let mut buf = [0u8; 24];
        buf[0..4].copy_from_slice(&8u32.to_le_bytes());
        buf[8..12].copy_from_slice(&(-8i32).to_le_bytes());
        buf[12..16].copy_from_slice(&7u32.to_le_bytes());
        buf[16..18].copy_from_slice(&6u16.to_le_bytes());
        buf[18..20].copy_from_slice(&8u16.to_le_bytes());
        buf[20..22].copy_from_slice(&4u16.to_le_bytes());
        let table = root(&buf).unwrap();
        assert_eq!(table.u32_or(0, 0).unwrap(), 7);
        assert_eq!(table.i32_or(1, -1).unwrap(), -1);
    }

    #[test]
    fn test_vtable_past_end_rejected() {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&8u32.to_le_bytes());
        buf[8..12].copy_from_slice(&(-12i32).to_le_bytes());
        assert_eq!(root(&buf).unwrap_err(), CorruptReason::BadVtable { table: 8 });
    }

    #[test]
    fn test_vector_index_checked() {
        // Vector claiming 3 elements with room for one
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&3u32.to_le_bytes());
        buf[4..8].copy_from_slice(&(-5i32).to_le_bytes());
        let vector = Vector::at(&buf, 0).unwrap();
        assert_eq!(vector.i32(0, "id").unwrap(), -5);
        assert!(matches!(vector.i32(1, "id"), Err(CorruptReason::OutOfBounds { .. })));
        assert_eq!(
            vector.i32(3, "id").unwrap_err(),
            CorruptReason::IndexOutOfRange { what: "id", index: 3, len: 3 }
        );
    }
}
