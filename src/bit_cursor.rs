//! Position-tracking bit reader/writer over a fixed byte region.
//!
//! Bit positions are absolute from the start of the region. Big-endian reads
//! take bits MSB-first from each byte, little-endian reads take them
//! LSB-first, which is how CTF packs bit fields of either byte order.

use crate::{
    errors::{ReadError, WriteError},
    layout::{ByteOrder, Encoding},
};

/// What stopped a string read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEnd {
    /// A NUL byte, consumed with the string.
    Terminator,
    /// `max_len` bytes were read without finding a NUL.
    Limit,
    /// The region ended before a NUL.
    EndOfRegion,
}

pub struct BitCursor<B> {
    data: B,
    bit_pos: usize,
}

impl<B: AsRef<[u8]>> BitCursor<B> {
    pub fn new(data: B) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Current offset in bits.
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Moves the cursor to an absolute bit offset (at most the capacity).
    pub fn set_position(&mut self, bit_pos: usize) -> Result<(), ReadError> {
        if bit_pos > self.capacity_bits() {
            return Err(ReadError::OutOfBounds);
        }

        self.bit_pos = bit_pos;
        Ok(())
    }

    pub fn capacity_bits(&self) -> usize {
        self.data.as_ref().len() * 8
    }

    pub fn remaining_bits(&self) -> usize {
        self.capacity_bits().saturating_sub(self.bit_pos)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<(), ReadError> {
        if n > self.remaining_bits() {
            return Err(ReadError::OutOfBounds);
        }

        self.bit_pos += n;
        Ok(())
    }

    /// Advances to the next multiple of `bits`. A boundary of 0 or 1 is a no-op.
    pub fn align_to(&mut self, bits: usize) {
        if bits <= 1 {
            return;
        }

        let rem = self.bit_pos % bits;
        if rem != 0 {
            self.bit_pos += bits - rem;
        }
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    fn check_span(&self, n: usize) -> Result<(), ReadError> {
        if n == 0 || n > 64 {
            return Err(ReadError::TooManyBitsRead);
        }

        if self
            .bit_pos
            .checked_add(n)
            .map_or(true, |end| end > self.capacity_bits())
        {
            return Err(ReadError::OutOfBounds);
        }

        Ok(())
    }

    /// Reads `n` bits (1..=64) as an unsigned value.
    pub fn read_bits(&mut self, n: usize, order: ByteOrder) -> Result<u64, ReadError> {
        self.check_span(n)?;

        let data = self.data.as_ref();
        let mut value = 0u64;
        let mut shift = 0;
        let mut pos = self.bit_pos;
        let mut remaining = n;

        while remaining > 0 {
            let byte = data[pos / 8];
            let offset = pos % 8;
            let take = (8 - offset).min(remaining);
            let mask = low_mask(take);

            match order {
                ByteOrder::BigEndian => {
                    let part = (byte >> (8 - offset - take)) & mask;
                    value = (value << take) | part as u64;
                }
                ByteOrder::LittleEndian => {
                    let part = (byte >> offset) & mask;
                    value |= (part as u64) << shift;
                    shift += take;
                }
            }

            pos += take;
            remaining -= take;
        }

        self.bit_pos = pos;
        Ok(value)
    }

    /// Reads `n` bits and sign-extends them when `signed` is set. Unsigned
    /// 64-bit values keep their full bit pattern in the returned `i64`.
    pub fn read_int(&mut self, n: usize, signed: bool, order: ByteOrder) -> Result<i64, ReadError> {
        let raw = self.read_bits(n, order)?;
        if signed {
            Ok(sign_extend(raw, n))
        } else {
            Ok(raw as i64)
        }
    }

    /// Reads a NUL-terminated string. Stops at the terminator (which is
    /// consumed), after `max_len` bytes, or at the end of the region.
    pub fn read_string(
        &mut self,
        max_len: Option<usize>,
        encoding: Encoding,
    ) -> Result<String, ReadError> {
        self.read_string_until(max_len, encoding).map(|(value, _)| value)
    }

    /// Like [BitCursor::read_string], also reporting what ended the string.
    ///
    /// `max_len` counts text bytes only: a terminator right after `max_len`
    /// bytes still ends the string with [StringEnd::Terminator].
    pub fn read_string_until(
        &mut self,
        max_len: Option<usize>,
        encoding: Encoding,
    ) -> Result<(String, StringEnd), ReadError> {
        if self.bit_pos % 8 != 0 {
            return Err(ReadError::Unaligned);
        }

        let data = self.data.as_ref();
        let start = self.bit_pos / 8;
        if start >= data.len() {
            return Err(ReadError::OutOfBounds);
        }

        let rest = &data[start..];
        let scan = max_len.map_or(rest.len(), |max| max.saturating_add(1));
        let (text, consumed, end) = match rest.iter().take(scan).position(|&b| b == 0) {
            Some(nul) => (&rest[..nul], nul + 1, StringEnd::Terminator),
            None => match max_len {
                Some(max) if max < rest.len() => (&rest[..max], max, StringEnd::Limit),
                _ => (rest, rest.len(), StringEnd::EndOfRegion),
            },
        };

        let value = encoding.decode(text);
        self.bit_pos += consumed * 8;

        Ok((value, end))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitCursor<B> {
    fn check_write_span(&self, n: usize) -> Result<(), WriteError> {
        self.check_span(n).map_err(|err| match err {
            ReadError::TooManyBitsRead => WriteError::TooManyBitsRead,
            _ => WriteError::OutOfBounds,
        })
    }

    /// Writes the low `n` bits of `value` using the same bit numbering as [BitCursor::read_bits].
    pub fn write_bits(&mut self, value: u64, n: usize, order: ByteOrder) -> Result<(), WriteError> {
        self.check_write_span(n)?;

        let data = self.data.as_mut();
        let mut pos = self.bit_pos;
        let mut remaining = n;
        let mut done = 0;

        while remaining > 0 {
            let index = pos / 8;
            let offset = pos % 8;
            let take = (8 - offset).min(remaining);
            let mask = low_mask(take);

            let (part, shift) = match order {
                ByteOrder::BigEndian => {
                    remaining -= take;
                    ((value >> remaining) as u8 & mask, 8 - offset - take)
                }
                ByteOrder::LittleEndian => {
                    let part = (value >> done) as u8 & mask;
                    done += take;
                    remaining -= take;
                    (part, offset)
                }
            };

            data[index] = (data[index] & !(mask << shift)) | (part << shift);
            pos += take;
        }

        self.bit_pos = pos;
        Ok(())
    }

    pub fn write_int(&mut self, value: i64, n: usize, order: ByteOrder) -> Result<(), WriteError> {
        self.write_bits(value as u64, n, order)
    }

    pub fn write_f32(&mut self, value: f32, order: ByteOrder) -> Result<(), WriteError> {
        self.write_bits(value.to_bits() as u64, 32, order)
    }

    pub fn write_f64(&mut self, value: f64, order: ByteOrder) -> Result<(), WriteError> {
        self.write_bits(value.to_bits(), 64, order)
    }

    /// Writes the bytes of `text` followed by a NUL terminator.
    pub fn write_string(&mut self, text: &str) -> Result<(), WriteError> {
        if self.bit_pos % 8 != 0 {
            return Err(WriteError::Unaligned);
        }

        let bytes = text.as_bytes();
        if bytes.contains(&0) {
            return Err(WriteError::InvalidValue);
        }

        let start = self.bit_pos / 8;
        let data = self.data.as_mut();
        let end = start + bytes.len() + 1;
        if end > data.len() {
            return Err(WriteError::OutOfBounds);
        }

        data[start..end - 1].copy_from_slice(bytes);
        data[end - 1] = 0;
        self.bit_pos = end * 8;

        Ok(())
    }
}

fn low_mask(bits: usize) -> u8 {
    ((1u16 << bits) - 1) as u8
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}
