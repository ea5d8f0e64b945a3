//! Symbol <-> bits through a [`Codebook`]
//!
//! With `run_size` keying a symbol is written as the code for
//! `(run, size)` followed by `size` magnitude bits. Positive values are
//! written as-is; negative values as the ones-complement of their magnitude,
//! so the leading magnitude bit tells the sign.

use super::bitstream::{BitstreamReader, BitstreamWriter};
use super::huffman::{Codebook, Keying};
use super::rle::Symbol;
use crate::error::{Error, Result};

/// Largest magnitude class a `run_size` codebook may use
pub const MAX_MAGNITUDE_BITS: u8 = 16;

/// Which table a symbol is coded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    /// First symbol of a block
    Dc,
    /// Every later symbol, including EOB
    Ac,
}

/// Number of bits needed for `|value|`; 0 for 0
#[inline]
pub fn magnitude_size(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// Magnitude bits of `value` in a `size`-bit field
#[inline]
pub fn magnitude_bits(value: i32, size: u8) -> u32 {
    if size == 0 {
        return 0;
    }
    let mask = (1i64 << size) - 1;
    if value >= 0 {
        (value as i64 & mask) as u32
    } else {
        ((value as i64 - 1) & mask) as u32
    }
}

/// Inverse of [`magnitude_bits`]
#[inline]
pub fn extend_magnitude(bits: u32, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }
    if bits < 1 << (size - 1) {
        (bits as i64 - ((1i64 << size) - 1)) as i32
    } else {
        bits as i32
    }
}

/// Huffman coding of run-length symbols
#[derive(Debug, Clone, Copy)]
pub struct HuffmanCodec<'a> {
    codebook: &'a Codebook,
}

impl<'a> HuffmanCodec<'a> {
    pub fn new(codebook: &'a Codebook) -> Self {
        Self { codebook }
    }

    /// Write one symbol
    ///
    /// # Errors
    /// `UncodableSymbol` if the codebook has no entry for it.
    pub fn encode(
        &self,
        writer: &mut BitstreamWriter,
        symbol: Symbol,
        class: SymbolClass,
    ) -> Result<()> {
        let keying = self.codebook.keying();
        let key = keying.key(symbol);
        let (code, length) = self
            .codebook
            .table_for(class)
            .code(key)
            .ok_or(Error::UncodableSymbol {
                run: symbol.run,
                value: symbol.value,
            })?;
        writer.write_bits(code, length);

        // sizes above MAX_MAGNITUDE_BITS never have a code, so `key.1` fits
        if keying == Keying::RunSize {
            let size = key.1 as u8;
            writer.write_bits(magnitude_bits(symbol.value, size), size);
        }
        Ok(())
    }

    /// Read one symbol
    pub fn decode(&self, reader: &mut BitstreamReader, class: SymbolClass) -> Result<Symbol> {
        let (run, key) = self.codebook.table_for(class).decode(reader)?;
        match self.codebook.keying() {
            Keying::Literal => Ok(Symbol::new(run, key)),
            Keying::RunSize => {
                let size = key as u8;
                let bits = reader.read_bits(size)?;
                Ok(Symbol::new(run, extend_magnitude(bits, size)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_size() {
        assert_eq!(magnitude_size(0), 0);
        assert_eq!(magnitude_size(1), 1);
        assert_eq!(magnitude_size(-1), 1);
        assert_eq!(magnitude_size(3), 2);
        assert_eq!(magnitude_size(-4), 3);
        assert_eq!(magnitude_size(1632), 11);
    }

    #[test]
    fn test_magnitude_bits_ones_complement() {
        assert_eq!(magnitude_bits(3, 2), 0b11);
        assert_eq!(magnitude_bits(-3, 2), 0b00);
        assert_eq!(magnitude_bits(-1, 1), 0b0);
        assert_eq!(magnitude_bits(5, 3), 0b101);
        assert_eq!(magnitude_bits(-5, 3), 0b010);
    }

    #[test]
    fn test_extend_magnitude() {
        for value in [-1000, -17, -2, -1, 1, 2, 17, 1000] {
            let size = magnitude_size(value);
            assert_eq!(extend_magnitude(magnitude_bits(value, size), size), value);
        }
        assert_eq!(extend_magnitude(0, 0), 0);
    }

    #[test]
    fn test_run_size_symbols() {
        let codebook = Codebook::builtin().unwrap();
        let codec = HuffmanCodec::new(&codebook);
        let symbols = [
            (Symbol::new(0, 51), SymbolClass::Dc),
            (Symbol::new(0, -3), SymbolClass::Ac),
            (Symbol::new(8, 1), SymbolClass::Ac),
            (Symbol::EOB, SymbolClass::Ac),
            (Symbol::new(0, 0), SymbolClass::Dc),
            (Symbol::new(14, -2047), SymbolClass::Ac),
        ];

        let mut bw = BitstreamWriter::new();
        for &(symbol, class) in &symbols {
            codec.encode(&mut bw, symbol, class).unwrap();
        }
        let bytes = bw.into_bytes();

        let mut br = BitstreamReader::new(&bytes);
        for &(symbol, class) in &symbols {
            assert_eq!(codec.decode(&mut br, class).unwrap(), symbol);
        }
        assert!(br.at_padding());
    }

    #[test]
    fn test_literal_symbols() {
        let json = r#"{
            "keying": "literal",
            "table": [
                { "run": 0, "key": 0, "length": 1 },
                { "run": 0, "key": 51, "length": 2 },
                { "run": 8, "key": 3, "length": 2 }
            ]
        }"#;
        let codebook = Codebook::from_json(json).unwrap();
        let codec = HuffmanCodec::new(&codebook);

        let mut bw = BitstreamWriter::new();
        codec.encode(&mut bw, Symbol::new(0, 51), SymbolClass::Dc).unwrap();
        codec.encode(&mut bw, Symbol::new(8, 3), SymbolClass::Ac).unwrap();
        codec.encode(&mut bw, Symbol::EOB, SymbolClass::Ac).unwrap();
        assert_eq!(bw.bit_len(), 5);

        let err = codec
            .encode(&mut bw, Symbol::new(0, 52), SymbolClass::Ac)
            .unwrap_err();
        assert!(matches!(err, Error::UncodableSymbol { run: 0, value: 52 }));
    }

    #[test]
    fn test_truncated_magnitude() {
        let codebook = Codebook::builtin().unwrap();
        let codec = HuffmanCodec::new(&codebook);
        let mut bw = BitstreamWriter::new();
        codec
            .encode(&mut bw, Symbol::new(0, 1000), SymbolClass::Dc)
            .unwrap();
        let mut bytes = bw.into_bytes();
        bytes.truncate(1);

        let mut br = BitstreamReader::new(&bytes);
        let err = codec.decode(&mut br, SymbolClass::Dc).unwrap_err();
        assert!(err.is_stream_error());
    }
}
