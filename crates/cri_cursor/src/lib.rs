//! Bounds-checked sequential and random access over an in-memory byte buffer.
//!
//! Both CRI container codecs are built on [`ByteCursor`]. Every multi-byte
//! accessor takes its byte order as a [`byteorder::ByteOrder`] type parameter,
//! mirroring [`byteorder::ReadBytesExt`]:
//!
//! ```
//! use byteorder::BigEndian;
//! use cri_cursor::ByteCursor;
//!
//! let mut cursor = ByteCursor::new([0x40, 0x55, 0x54, 0x46, 0x00, 0x00, 0x01, 0x00]);
//! assert_eq!(cursor.read_bytes(4)?, b"@UTF");
//! assert_eq!(cursor.read_u32::<BigEndian>()?, 0x100);
//! assert!(cursor.read_u8().is_err());
//! # Ok::<(), cri_cursor::error::Error>(())
//! ```
//!
//! Reads and writes never run past the end of the buffer: the cursor fails
//! with [`Error::OutOfBounds`] instead of returning partial data or growing.

pub mod error;

use std::ops::Range;

use byteorder::ByteOrder;

pub use error::Error;
use error::Result;

/// Round `value` up to the next multiple of `alignment`.
///
/// Returns `None` when `alignment` is zero or the result overflows.
pub fn align_up(value: u64, alignment: u64) -> Option<u64> {
    value.checked_next_multiple_of(alignment)
}

/// A cursor over a borrowed or owned byte buffer.
///
/// Reading requires `T: AsRef<[u8]>`, writing additionally `T: AsMut<[u8]>`.
/// Writers operate on a pre-sized buffer, e.g. `ByteCursor::new(vec![0; size])`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteCursor<T> {
    inner: T,
    pos: usize,
}

impl<T> ByteCursor<T> {
    /// Creates a cursor positioned at the start of `inner`.
    pub const fn new(inner: T) -> ByteCursor<T> {
        ByteCursor { inner, pos: 0 }
    }

    /// Current position from the start of the buffer
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Gets a reference to the underlying buffer
    pub const fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Unwrap and return the underlying buffer
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: AsRef<[u8]>> ByteCursor<T> {
    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.inner.as_ref().len()
    }

    /// Whether the underlying buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes left between the position and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.len() - self.pos
    }

    /// Moves the cursor. The end of the buffer is a valid position.
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        let range = self.span(pos, 0)?;
        self.pos = range.start;
        Ok(())
    }

    /// Advances the cursor by `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        let range = self.span(self.pos, count)?;
        self.pos = range.end;
        Ok(())
    }

    fn span(&self, offset: usize, requested: usize) -> Result<Range<usize>> {
        let len = self.len();
        offset
            .checked_add(requested)
            .filter(|end| *end <= len)
            .map(|end| offset..end)
            .ok_or(Error::OutOfBounds {
                offset,
                requested,
                len,
            })
    }

    /// Returns `count` bytes at an absolute offset without moving the cursor.
    pub fn bytes_at(&self, offset: usize, count: usize) -> Result<&[u8]> {
        let range = self.span(offset, count)?;
        Ok(&self.inner.as_ref()[range])
    }

    /// Reads `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8]> {
        let range = self.span(self.pos, count)?;
        self.pos = range.end;
        Ok(&self.inner.as_ref()[range])
    }

    /// Reads a null-terminated string starting at `base + offset` without moving the cursor.
    ///
    /// The terminator is not part of the result. The search stops at the end
    /// of the buffer, so callers wanting a tighter bound should hand in a
    /// cursor over the sub-slice they trust.
    pub fn read_cstring_at(&self, base: usize, offset: usize) -> Result<&[u8]> {
        let start = base.checked_add(offset).ok_or(Error::OutOfBounds {
            offset: base,
            requested: offset,
            len: self.len(),
        })?;
        let tail = self.bytes_at(start, 1).map(|_| &self.inner.as_ref()[start..])?;
        let end = tail
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::UnterminatedString { offset: start })?;
        Ok(&tail[..end])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16<E: ByteOrder>(&mut self) -> Result<u16> {
        Ok(E::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16<E: ByteOrder>(&mut self) -> Result<i16> {
        Ok(E::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32<E: ByteOrder>(&mut self) -> Result<u32> {
        Ok(E::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32<E: ByteOrder>(&mut self) -> Result<i32> {
        Ok(E::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64<E: ByteOrder>(&mut self) -> Result<u64> {
        Ok(E::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64<E: ByteOrder>(&mut self) -> Result<i64> {
        Ok(E::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f32<E: ByteOrder>(&mut self) -> Result<f32> {
        Ok(E::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64<E: ByteOrder>(&mut self) -> Result<f64> {
        Ok(E::read_f64(self.read_bytes(8)?))
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> ByteCursor<T> {
    /// Writes raw bytes at the current position.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let range = self.span(self.pos, bytes.len())?;
        self.pos = range.end;
        self.inner.as_mut()[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Writes `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        let range = self.span(self.pos, count)?;
        self.pos = range.end;
        self.inner.as_mut()[range].fill(0);
        Ok(())
    }

    /// Writes zero bytes until the position is a multiple of `alignment`.
    ///
    /// Does nothing when the position is already aligned.
    pub fn pad_to(&mut self, alignment: usize) -> Result<()> {
        let target = self
            .pos
            .checked_next_multiple_of(alignment)
            .ok_or(Error::InvalidAlignment(alignment))?;
        self.write_zeros(target - self.pos)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u16<E: ByteOrder>(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        E::write_u16(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_i16<E: ByteOrder>(&mut self, value: i16) -> Result<()> {
        let mut buf = [0u8; 2];
        E::write_i16(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_u32<E: ByteOrder>(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        E::write_u32(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_i32<E: ByteOrder>(&mut self, value: i32) -> Result<()> {
        let mut buf = [0u8; 4];
        E::write_i32(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_u64<E: ByteOrder>(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        E::write_u64(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_i64<E: ByteOrder>(&mut self, value: i64) -> Result<()> {
        let mut buf = [0u8; 8];
        E::write_i64(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_f32<E: ByteOrder>(&mut self, value: f32) -> Result<()> {
        let mut buf = [0u8; 4];
        E::write_f32(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_f64<E: ByteOrder>(&mut self, value: f64) -> Result<()> {
        let mut buf = [0u8; 8];
        E::write_f64(&mut buf, value);
        self.write_bytes(&buf)
    }
}
