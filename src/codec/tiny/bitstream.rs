//! Bit-level reader and writer for the tiny codec bitstream
//!
//! Symbols are packed MSB-first with no alignment between them. The only
//! padding is the zero fill of the final partial byte when a stream is
//! finished, so a decoder must stop by geometry, never by "end of data".

use crate::error::{Error, Result};

/// Bitstream reader over a byte slice
pub struct BitstreamReader<'a> {
    /// The underlying byte data
    data: &'a [u8],
    /// Current bit position (0-based from start of data)
    bit_pos: usize,
}

impl<'a> BitstreamReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        BitstreamReader { data, bit_pos: 0 }
    }

    /// Read a single bit
    ///
    /// # Errors
    /// Returns `Error::TruncatedBitstream` if no bits remain.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bit_pos >= self.data.len() * 8 {
            return Err(Error::TruncatedBitstream {
                position: self.bit_pos,
            });
        }

        let byte_idx = self.bit_pos / 8;
        let bit_idx = 7 - (self.bit_pos % 8); // MSB first
        let bit = (self.data[byte_idx] >> bit_idx) & 1;
        self.bit_pos += 1;
        Ok(bit != 0)
    }

    /// Read `n` bits (at most 32) as an MSB-first integer
    ///
    /// On truncation nothing is consumed.
    #[inline]
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(Error::invalid_input(
                "Cannot read more than 32 bits at once",
            ));
        }
        if (n as usize) > self.remaining() {
            return Err(Error::TruncatedBitstream {
                position: self.bit_pos,
            });
        }

        let mut result: u32 = 0;
        for _ in 0..n {
            result = (result << 1) | (self.read_bit()? as u32);
        }
        Ok(result)
    }

    /// Current bit position
    #[inline]
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Bits left, including any trailing pad bits
    #[inline]
    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// True when only the final byte's zero padding is left
    pub fn at_padding(&self) -> bool {
        let remaining = self.remaining();
        if remaining >= 8 {
            return false;
        }
        let mut rest = BitstreamReader {
            data: self.data,
            bit_pos: self.bit_pos,
        };
        (0..remaining).all(|_| matches!(rest.read_bit(), Ok(false)))
    }
}

/// Bitstream writer into a growable byte buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitstreamWriter {
    /// Complete bytes
    data: Vec<u8>,
    /// Byte being assembled, low `bit_count` bits valid
    current_byte: u8,
    /// Bits in `current_byte` (0-7)
    bit_count: usize,
}

impl BitstreamWriter {
    pub fn new() -> Self {
        BitstreamWriter {
            data: Vec::new(),
            current_byte: 0,
            bit_count: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BitstreamWriter {
            data: Vec::with_capacity(capacity),
            current_byte: 0,
            bit_count: 0,
        }
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.current_byte = (self.current_byte << 1) | (bit as u8);
        self.bit_count += 1;

        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// Write the low `n` bits of `value`, MSB first
    #[inline]
    pub fn write_bits(&mut self, value: u32, n: u8) {
        debug_assert!(n <= 32, "Cannot write more than 32 bits at once");

        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    /// Append every bit written to `other`, without padding between them
    pub fn append(&mut self, other: &BitstreamWriter) {
        if self.bit_count == 0 {
            self.data.extend_from_slice(&other.data);
        } else {
            for &byte in &other.data {
                self.write_bits(byte as u32, 8);
            }
        }
        self.write_bits(other.current_byte as u32, other.bit_count as u8);
    }

    /// Remove and return the complete bytes written so far
    ///
    /// The partial byte stays in the writer, so later bits continue it.
    pub fn take_complete_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Pad the partial byte with zeros
    pub fn flush(&mut self) {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// Consume the writer, padding the final byte
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.data
    }

    /// Bits currently held (complete bytes plus the partial byte)
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8 + self.bit_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bit_len() == 0
    }
}

impl Default for BitstreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let data = [0b1011_0001, 0b0101_0101];
        let mut br = BitstreamReader::new(&data);
        assert!(br.read_bit().unwrap());
        assert!(!br.read_bit().unwrap());
        assert_eq!(br.read_bits(6).unwrap(), 0b11_0001);
        assert_eq!(br.read_bits(8).unwrap(), 0b0101_0101);
        assert!(br.is_empty());
    }

    #[test]
    fn test_truncation_reports_position() {
        let data = [0xFF];
        let mut br = BitstreamReader::new(&data);
        br.read_bits(5).unwrap();
        let err = br.read_bits(4).unwrap_err();
        assert!(matches!(err, Error::TruncatedBitstream { position: 5 }));
        // nothing consumed on failure
        assert_eq!(br.position(), 5);
    }

    #[test]
    fn test_write_and_pad() {
        let mut bw = BitstreamWriter::new();
        bw.write_bits(0b101, 3);
        assert_eq!(bw.bit_len(), 3);
        assert_eq!(bw.into_bytes(), vec![0b1010_0000]);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let mut bw = BitstreamWriter::new();
        bw.write_bits(0x3, 2);
        bw.write_bits(0x1FFFF, 17);
        bw.write_bits(0, 1);
        bw.write_bits(0xABCD, 16);
        let bytes = bw.into_bytes();

        let mut br = BitstreamReader::new(&bytes);
        assert_eq!(br.read_bits(2).unwrap(), 0x3);
        assert_eq!(br.read_bits(17).unwrap(), 0x1FFFF);
        assert_eq!(br.read_bits(1).unwrap(), 0);
        assert_eq!(br.read_bits(16).unwrap(), 0xABCD);
        assert!(br.at_padding());
    }

    #[test]
    fn test_append_unaligned() {
        let mut a = BitstreamWriter::new();
        a.write_bits(0b1, 1);
        let mut b = BitstreamWriter::new();
        b.write_bits(0b0110_1001, 8);
        b.write_bits(0b11, 2);

        a.append(&b);
        assert_eq!(a.bit_len(), 11);
        assert_eq!(a.into_bytes(), vec![0b1011_0100, 0b1110_0000]);
    }

    #[test]
    fn test_append_aligned() {
        let mut a = BitstreamWriter::new();
        a.write_bits(0xAA, 8);
        let mut b = BitstreamWriter::new();
        b.write_bits(0x55, 8);
        b.write_bits(0b1, 1);
        a.append(&b);
        assert_eq!(a.into_bytes(), vec![0xAA, 0x55, 0x80]);
    }

    #[test]
    fn test_take_complete_bytes_keeps_partial() {
        let mut bw = BitstreamWriter::new();
        bw.write_bits(0xF0F, 12);
        assert_eq!(bw.take_complete_bytes(), vec![0xF0]);
        assert_eq!(bw.bit_len(), 4);
        bw.write_bits(0xA, 4);
        assert_eq!(bw.into_bytes(), vec![0xFA]);
    }

    #[test]
    fn test_at_padding() {
        let data = [0b1100_0000];
        let mut br = BitstreamReader::new(&data);
        assert!(!br.at_padding());
        br.read_bits(2).unwrap();
        assert!(br.at_padding());

        let data = [0b1100_0100];
        let mut br = BitstreamReader::new(&data);
        br.read_bits(2).unwrap();
        assert!(!br.at_padding());
    }
}
