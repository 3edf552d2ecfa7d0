//! Bit-granular cursor over frame bytes.
//!
//! [`BitCursor`] reads MSB-first fields out of a growable buffer, and
//! [`BitCursorWriter`] is its mirror. Both implement [`BitSyntax`], which lets
//! a header block describe its field list once and run it in either direction.

use std::io;
use std::io::SeekFrom;
use std::mem;

use anyhow::Result;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, UnsignedInteger};

use crate::utils::errors::BitstreamError;

#[derive(Debug)]
pub struct BitCursor {
    bs: BitReader<io::Cursor<Vec<u8>>, BigEndian>,
    pos: u64,
    len: u64,
}

impl BitCursor {
    pub fn new(data: Vec<u8>) -> Self {
        let len = (data.len() as u64) << 3;

        Self {
            bs: BitReader::new(io::Cursor::new(data)),
            pos: 0,
            len,
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    #[inline(always)]
    fn check(&self, op: &'static str, n: u64) -> Result<(), BitstreamError> {
        if n > self.available() {
            return Err(BitstreamError::OutOfRange {
                op,
                requested: n,
                available: self.available(),
                position: self.pos,
            });
        }

        Ok(())
    }

    #[inline(always)]
    pub fn get(&mut self) -> Result<bool, BitstreamError> {
        self.check("get", 1)?;
        let bit = self.bs.read_bit()?;
        self.pos += 1;

        Ok(bit)
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> Result<I, BitstreamError> {
        if !(1..=32).contains(&n) {
            return Err(BitstreamError::InvalidWidth(n));
        }

        self.check("get_n", n as u64)?;
        let value = self.bs.read_unsigned_var(n)?;
        self.pos += n as u64;

        Ok(value)
    }

    /// Two's complement field of `n` bits.
    pub fn get_s(&mut self, n: u32) -> Result<i32, BitstreamError> {
        let value: u32 = self.get_n(n)?;
        let shift = 32 - n;

        Ok(((value << shift) as i32) >> shift)
    }

    /// Grouped variable-length value: each group of `n` bits is followed by a
    /// continuation bit, up to `max_num_groups` continuations.
    pub fn get_variable_bits_max(
        &mut self,
        n: u32,
        max_num_groups: u32,
    ) -> Result<u32, BitstreamError> {
        let mut value = 0;
        let mut num_group = 0;
        let mut read_more = true;

        while read_more && num_group < max_num_groups {
            value += self.get_n::<u32>(n)?;
            read_more = self.get()?;
            if read_more {
                value = (value + 1) << n;
                num_group += 1;
            }
        }

        Ok(value)
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<Vec<u8>, BitstreamError> {
        self.check("get_bytes", (len as u64) << 3)?;

        let mut buf = vec![0; len];
        self.bs.read_bytes(&mut buf)?;
        self.pos += (len as u64) << 3;

        Ok(buf)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> Result<(), BitstreamError> {
        self.check("skip_n", n as u64)?;
        self.bs.skip(n)?;
        self.pos += n as u64;

        Ok(())
    }

    /// Appends bytes to the backing buffer, keeping the read position.
    pub fn expand(&mut self, more: &[u8]) -> Result<(), BitstreamError> {
        if more.is_empty() {
            return Ok(());
        }

        let placeholder = BitReader::new(io::Cursor::new(Vec::new()));
        let mut cursor = mem::replace(&mut self.bs, placeholder).into_reader();
        cursor.get_mut().extend_from_slice(more);

        self.bs = BitReader::new(cursor);
        self.bs.seek_bits(SeekFrom::Start(self.pos))?;
        self.len += (more.len() as u64) << 3;

        Ok(())
    }

    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline(always)]
    pub fn available(&self) -> u64 {
        self.len - self.pos
    }

    pub fn len_bytes(&self) -> usize {
        (self.len >> 3) as usize
    }
}

pub struct BitCursorWriter {
    bs: BitWriter<Vec<u8>, BigEndian>,
    pos: u64,
}

impl Default for BitCursorWriter {
    fn default() -> Self {
        Self {
            bs: BitWriter::new(Vec::new()),
            pos: 0,
        }
    }
}

impl BitCursorWriter {
    pub fn put(&mut self, value: u32, bits: u32) -> Result<(), BitstreamError> {
        if !(1..=32).contains(&bits) {
            return Err(BitstreamError::InvalidWidth(bits));
        }

        if bits < 32 && value >> bits != 0 {
            return Err(BitstreamError::ValueTooWide { value, bits });
        }

        self.bs.write_unsigned_var(bits, value)?;
        self.pos += bits as u64;

        Ok(())
    }

    pub fn put_bit(&mut self, bit: bool) -> Result<(), BitstreamError> {
        self.bs.write_bit(bit)?;
        self.pos += 1;

        Ok(())
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), BitstreamError> {
        self.bs.write_bytes(bytes)?;
        self.pos += (bytes.len() as u64) << 3;

        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Zero-pads to the next byte boundary and returns the written bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, BitstreamError> {
        self.bs.byte_align()?;
        Ok(self.bs.into_writer())
    }
}

/// Unsigned field types a [`BitSyntax`] can carry.
pub trait Field: Copy + Default {
    fn to_bits(self) -> u32;
    fn from_bits(bits: u32) -> Self;
}

macro_rules! impl_field {
    ($($t:ty),*) => {$(
        impl Field for $t {
            #[inline(always)]
            fn to_bits(self) -> u32 {
                self as u32
            }

            #[inline(always)]
            fn from_bits(bits: u32) -> Self {
                bits as $t
            }
        }
    )*};
}

impl_field!(u8, u16, u32);

/// One field list, two directions.
///
/// When reading, every call overwrites the passed value with what the
/// stream holds. When writing, every call emits the passed value. A block
/// written as a single `sync` over this trait therefore round-trips by
/// construction.
pub trait BitSyntax {
    fn reading(&self) -> bool;

    fn raw(&mut self, value: &mut u32, bits: u32) -> Result<()>;

    fn flag(&mut self, value: &mut bool) -> Result<()>;

    fn bytes(&mut self, value: &mut Vec<u8>, len: usize) -> Result<()>;

    fn field<T: Field>(&mut self, value: &mut T, bits: u32) -> Result<()> {
        let mut raw = value.to_bits();
        self.raw(&mut raw, bits)?;
        *value = T::from_bits(raw);

        Ok(())
    }

    /// A field that only exists when `present` holds; cleared otherwise.
    fn field_if<T: Field>(&mut self, present: bool, value: &mut Option<T>, bits: u32) -> Result<()> {
        *value = if present {
            let mut inner = value.unwrap_or_default();
            self.field(&mut inner, bits)?;
            Some(inner)
        } else {
            None
        };

        Ok(())
    }

    /// A field behind its own presence bit.
    fn optional<T: Field>(&mut self, value: &mut Option<T>, bits: u32) -> Result<()>
    where
        Self: Sized,
    {
        self.group(value, |bs, inner| bs.field(inner, bits))
    }

    /// A group of fields behind one presence bit.
    fn group<T, F>(&mut self, value: &mut Option<T>, body: F) -> Result<()>
    where
        Self: Sized,
        T: Default,
        F: FnOnce(&mut Self, &mut T) -> Result<()>,
    {
        let mut present = value.is_some();
        self.flag(&mut present)?;

        *value = if present {
            let mut inner = value.take().unwrap_or_default();
            body(self, &mut inner)?;
            Some(inner)
        } else {
            None
        };

        Ok(())
    }
}

impl BitSyntax for BitCursor {
    fn reading(&self) -> bool {
        true
    }

    fn raw(&mut self, value: &mut u32, bits: u32) -> Result<()> {
        *value = self.get_n(bits)?;
        Ok(())
    }

    fn flag(&mut self, value: &mut bool) -> Result<()> {
        *value = self.get()?;
        Ok(())
    }

    fn bytes(&mut self, value: &mut Vec<u8>, len: usize) -> Result<()> {
        *value = self.get_bytes(len)?;
        Ok(())
    }
}

impl BitSyntax for BitCursorWriter {
    fn reading(&self) -> bool {
        false
    }

    fn raw(&mut self, value: &mut u32, bits: u32) -> Result<()> {
        self.put(*value, bits)?;
        Ok(())
    }

    fn flag(&mut self, value: &mut bool) -> Result<()> {
        self.put_bit(*value)?;
        Ok(())
    }

    fn bytes(&mut self, value: &mut Vec<u8>, len: usize) -> Result<()> {
        if value.len() != len {
            return Err(BitstreamError::OutOfRange {
                op: "put_bytes",
                requested: (len as u64) << 3,
                available: (value.len() as u64) << 3,
                position: self.pos,
            }
            .into());
        }

        self.put_bytes(value)?;
        Ok(())
    }
}

/// A byte source that hands out exactly `len` more bytes on request.
pub trait BlockRead {
    fn read_block(&mut self, len: usize) -> Result<Vec<u8>>;
}

impl<R: io::Read> BlockRead for R {
    fn read_block(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_msb_first() -> Result<()> {
        let mut cursor = BitCursor::from_slice(&[0b1011_0011, 0xFF]);

        assert!(cursor.get()?);
        assert_eq!(cursor.get_n::<u8>(3)?, 0b011);
        cursor.skip_n(2)?;
        assert_eq!(cursor.get_n::<u16>(10)?, 0b11_1111_1111);
        assert_eq!(cursor.available(), 0);

        Ok(())
    }

    #[test]
    fn signed_and_grouped_fields() -> Result<()> {
        let mut cursor = BitCursor::from_slice(&[0b1110_1111, 0b1010_0000]);

        assert_eq!(cursor.get_s(3)?, -1);
        assert_eq!(cursor.get_s(3)?, 3);
        // 11 + continue, then 01 stop: ((3 + 1) << 2) + 1
        assert_eq!(cursor.get_variable_bits_max(2, 4)?, 17);

        Ok(())
    }

    #[test]
    fn over_read_is_out_of_range() {
        let mut cursor = BitCursor::from_slice(&[0xAA]);
        let err = cursor.get_n::<u16>(9).unwrap_err();

        assert!(matches!(
            err,
            BitstreamError::OutOfRange {
                requested: 9,
                available: 8,
                position: 0,
                ..
            }
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn width_is_bounded() {
        let mut cursor = BitCursor::from_slice(&[0; 8]);
        assert!(matches!(
            cursor.get_n::<u64>(33),
            Err(BitstreamError::InvalidWidth(33))
        ));
        assert!(matches!(
            cursor.get_n::<u32>(0),
            Err(BitstreamError::InvalidWidth(0))
        ));
    }

    #[test]
    fn expand_keeps_position() -> Result<()> {
        let mut cursor = BitCursor::from_slice(&[0x0B, 0x77, 0b1010_0000]);
        assert_eq!(cursor.get_n::<u16>(16)?, 0x0B77);
        assert_eq!(cursor.get_n::<u8>(3)?, 0b101);
        assert!(cursor.get_n::<u8>(8).is_err());

        cursor.expand(&[0xC3])?;
        assert_eq!(cursor.position(), 19);
        assert_eq!(cursor.get_n::<u8>(5)?, 0);
        assert_eq!(cursor.get_n::<u8>(8)?, 0xC3);
        assert_eq!(cursor.len_bytes(), 4);

        Ok(())
    }

    #[test]
    fn writer_pads_with_zero_bits() -> Result<()> {
        let mut writer = BitCursorWriter::default();
        writer.put(0x0B77, 16)?;
        writer.put_bit(true)?;
        writer.put(0b01, 2)?;
        assert_eq!(writer.position(), 19);

        assert_eq!(writer.finish()?, vec![0x0B, 0x77, 0b1010_0000]);

        Ok(())
    }

    #[test]
    fn writer_rejects_wide_values() {
        let mut writer = BitCursorWriter::default();
        assert!(matches!(
            writer.put(8, 3),
            Err(BitstreamError::ValueTooWide { value: 8, bits: 3 })
        ));
    }

    #[test]
    fn syntax_round_trip() -> Result<()> {
        #[derive(Default, Debug, PartialEq)]
        struct Block {
            a: u8,
            b: Option<u16>,
            c: Option<(u8, u8)>,
            d: Option<u8>,
        }

        fn sync<S: BitSyntax>(bs: &mut S, block: &mut Block) -> Result<()> {
            bs.field(&mut block.a, 3)?;
            bs.optional(&mut block.b, 12)?;
            bs.group(&mut block.c, |bs, (x, y)| {
                bs.field(x, 4)?;
                bs.field(y, 2)
            })?;
            bs.field_if(block.a > 4, &mut block.d, 5)
        }

        let mut block = Block {
            a: 5,
            b: None,
            c: Some((9, 3)),
            d: Some(17),
        };

        let mut writer = BitCursorWriter::default();
        sync(&mut writer, &mut block)?;
        let bytes = writer.finish()?;

        let mut decoded = Block::default();
        sync(&mut BitCursor::new(bytes), &mut decoded)?;
        assert_eq!(decoded, block);

        Ok(())
    }

    #[test]
    fn block_read_takes_exact_lengths() -> Result<()> {
        let data = [1u8, 2, 3, 4, 5];
        let mut source: &[u8] = &data;

        assert_eq!(source.read_block(2)?, vec![1, 2]);
        assert_eq!(source.len(), 3);
        assert!(source.read_block(4).is_err());

        Ok(())
    }
}
