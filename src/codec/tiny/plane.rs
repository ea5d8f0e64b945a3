//! Sample planes and the per-plane block codec
//!
//! A plane is cut into 4x4 tiles in raster order (tile rows top to bottom,
//! tiles left to right). Block order is the only synchronization between
//! encoder and decoder, so both sides walk tiles identically.

use super::bitstream::{BitstreamReader, BitstreamWriter};
use super::dc::DcPredictor;
use super::huffman::Codebook;
use super::rle::{collapse_into, BlockExpander, Symbol};
use super::scan::{unzigzag, zigzag};
use super::tables::BLOCK_SIZE;
use super::transform::{Block, Qp, TransformQuantizer};
use super::vlc::{HuffmanCodec, SymbolClass};
use crate::error::{Error, Result};
use tracing::trace;

/// A 2-D grid of 8-bit samples, both dimensions multiples of 4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Plane {
    /// Wrap row-major samples
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        validate_plane_dimensions(width, height)?;
        if data.len() != width * height {
            return Err(Error::invalid_input(format!(
                "plane {}x{} needs {} samples, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        Ok(Plane {
            width,
            height,
            data,
        })
    }

    /// Plane with every sample set to `value`
    pub fn filled(width: usize, height: usize, value: u8) -> Result<Self> {
        validate_plane_dimensions(width, height)?;
        Ok(Plane {
            width,
            height,
            data: vec![value; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn blocks_wide(&self) -> usize {
        self.width / BLOCK_SIZE
    }

    pub fn blocks_high(&self) -> usize {
        self.height / BLOCK_SIZE
    }

    pub fn block_count(&self) -> usize {
        self.blocks_wide() * self.blocks_high()
    }

    /// Samples of tile `index` in raster order
    pub fn block(&self, index: usize) -> Block {
        let (x0, y0) = self.block_origin(index);
        let mut block = Block::ZERO;
        for row in 0..BLOCK_SIZE {
            let start = (y0 + row) * self.width + x0;
            for col in 0..BLOCK_SIZE {
                block.set(row, col, self.data[start + col] as i32);
            }
        }
        block
    }

    /// Store a block of samples (already in [0, 255]) into tile `index`
    pub fn set_block(&mut self, index: usize, block: &Block) {
        let (x0, y0) = self.block_origin(index);
        for row in 0..BLOCK_SIZE {
            let start = (y0 + row) * self.width + x0;
            for col in 0..BLOCK_SIZE {
                self.data[start + col] = block.get(row, col).clamp(0, 255) as u8;
            }
        }
    }

    #[inline]
    fn block_origin(&self, index: usize) -> (usize, usize) {
        let bw = self.blocks_wide();
        ((index % bw) * BLOCK_SIZE, (index / bw) * BLOCK_SIZE)
    }

    /// Keep every other row and column (no filtering)
    pub fn decimate(&self) -> Result<Plane> {
        let width = self.width / 2;
        let height = self.height / 2;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &self.data[2 * y * self.width..(2 * y + 1) * self.width];
            data.extend(row.iter().step_by(2));
        }
        Plane::new(width, height, data)
    }

    /// Nearest-neighbour 2x upsampling
    pub fn upsample(&self) -> Plane {
        let width = self.width * 2;
        let height = self.height * 2;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &self.data[(y / 2) * self.width..(y / 2 + 1) * self.width];
            for &sample in row {
                data.push(sample);
                data.push(sample);
            }
        }
        Plane {
            width,
            height,
            data,
        }
    }
}

/// Both dimensions non-zero multiples of 4
pub fn validate_plane_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height, "plane is empty"));
    }
    if width % BLOCK_SIZE != 0 || height % BLOCK_SIZE != 0 {
        return Err(Error::invalid_dimensions(
            width,
            height,
            "plane dimensions must be multiples of 4",
        ));
    }
    Ok(())
}

/// Run every block of `plane` through transform, quantization, DC prediction,
/// scan and run-length coding, handing each symbol to `sink`
///
/// The first symbol of each block is [`SymbolClass::Dc`].
pub fn visit_symbols<F>(
    plane: &Plane,
    quantizer: &TransformQuantizer,
    predictor: &mut DcPredictor,
    mut sink: F,
) -> Result<()>
where
    F: FnMut(Symbol, SymbolClass) -> Result<()>,
{
    let mut symbols = Vec::with_capacity(17);
    for index in 0..plane.block_count() {
        let levels = quantizer.forward(&plane.block(index));
        let mut scanned = zigzag(&levels);
        scanned[0] = predictor.predict(scanned[0]);

        symbols.clear();
        collapse_into(&scanned, &mut symbols);
        trace!("block {}: {} symbols", index, symbols.len());

        for (i, &symbol) in symbols.iter().enumerate() {
            let class = if i == 0 { SymbolClass::Dc } else { SymbolClass::Ac };
            sink(symbol, class)?;
        }
    }
    Ok(())
}

/// Encodes and decodes single planes at a fixed QP
#[derive(Debug, Clone, Copy)]
pub struct PlaneCodec<'a> {
    quantizer: TransformQuantizer,
    codec: HuffmanCodec<'a>,
}

impl<'a> PlaneCodec<'a> {
    pub fn new(qp: Qp, codebook: &'a Codebook) -> Self {
        Self {
            quantizer: TransformQuantizer::new(qp),
            codec: HuffmanCodec::new(codebook),
        }
    }

    pub fn qp(&self) -> Qp {
        self.quantizer.qp()
    }

    /// Append the bits of every block of `plane` to `writer`
    ///
    /// `predictor` carries the DC state in and out, so the caller decides
    /// when it resets.
    pub fn encode(
        &self,
        plane: &Plane,
        predictor: &mut DcPredictor,
        writer: &mut BitstreamWriter,
    ) -> Result<()> {
        let codec = self.codec;
        visit_symbols(plane, &self.quantizer, predictor, |symbol, class| {
            codec.encode(writer, symbol, class)
        })
    }

    /// Read one `width` x `height` plane from `reader`
    pub fn decode(
        &self,
        reader: &mut BitstreamReader,
        width: usize,
        height: usize,
        predictor: &mut DcPredictor,
    ) -> Result<Plane> {
        let mut plane = Plane::filled(width, height, 0)?;
        for index in 0..plane.block_count() {
            let levels = self.decode_block(reader, predictor)?;
            plane.set_block(index, &self.quantizer.inverse(&levels));
        }
        Ok(plane)
    }

    /// Read one block's symbols and return its quantized levels
    fn decode_block(
        &self,
        reader: &mut BitstreamReader,
        predictor: &mut DcPredictor,
    ) -> Result<Block> {
        let mut expander = BlockExpander::new();

        let dc = self.codec.decode(reader, SymbolClass::Dc)?;
        if dc.run != 0 {
            return Err(Error::CorruptBlock {
                position: 0,
                run: dc.run,
            });
        }
        expander.push(Symbol::new(0, predictor.accumulate(dc.value)?))?;

        while !expander.is_complete() {
            let symbol = self.codec.decode(reader, SymbolClass::Ac)?;
            expander.push(symbol)?;
        }
        Ok(unzigzag(&expander.finish()))
    }

    /// Quantize and dequantize without entropy coding
    ///
    /// Equal to `decode(encode(plane))` for any codebook that can code the
    /// plane's symbols.
    pub fn reconstruct(&self, plane: &Plane) -> Plane {
        let mut out = plane.clone();
        for index in 0..plane.block_count() {
            let levels = self.quantizer.forward(&plane.block(index));
            out.set_block(index, &self.quantizer.inverse(&levels));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_plane(width: usize, height: usize) -> Plane {
        let data = (0..width * height)
            .map(|i| ((i % width) * 7 + (i / width) * 5) as u8)
            .collect();
        Plane::new(width, height, data).unwrap()
    }

    fn roundtrip(plane: &Plane, qp: i64) -> Plane {
        let codebook = Codebook::builtin().unwrap();
        let codec = PlaneCodec::new(Qp::new(qp).unwrap(), &codebook);

        let mut writer = BitstreamWriter::new();
        codec
            .encode(plane, &mut DcPredictor::new(), &mut writer)
            .unwrap();
        let bytes = writer.into_bytes();

        let mut reader = BitstreamReader::new(&bytes);
        let decoded = codec
            .decode(&mut reader, plane.width(), plane.height(), &mut DcPredictor::new())
            .unwrap();
        assert!(reader.at_padding());
        decoded
    }

    #[test]
    fn test_plane_validation() {
        assert!(Plane::new(8, 8, vec![0; 64]).is_ok());
        assert!(matches!(
            Plane::new(6, 8, vec![0; 48]),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Plane::filled(0, 4, 0),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Plane::new(8, 8, vec![0; 10]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_block_raster_order() {
        let plane = ramp_plane(8, 8);
        assert_eq!(plane.block_count(), 4);
        // tile 1 is the top-right tile
        assert_eq!(plane.block(1).get(0, 0), plane.sample(4, 0) as i32);
        // tile 2 starts the second tile row
        assert_eq!(plane.block(2).get(0, 0), plane.sample(0, 4) as i32);
    }

    #[test]
    fn test_set_block() {
        let mut plane = Plane::filled(8, 4, 0).unwrap();
        plane.set_block(1, &Block::filled(9));
        assert_eq!(plane.sample(3, 3), 0);
        assert_eq!(plane.sample(4, 0), 9);
        assert_eq!(plane.sample(7, 3), 9);
    }

    #[test]
    fn test_decimate_and_upsample() {
        let plane = ramp_plane(16, 8);
        let small = plane.decimate().unwrap();
        assert_eq!((small.width(), small.height()), (8, 4));
        assert_eq!(small.sample(3, 2), plane.sample(6, 4));

        let big = small.upsample();
        assert_eq!((big.width(), big.height()), (16, 8));
        assert_eq!(big.sample(7, 5), small.sample(3, 2));
    }

    #[test]
    fn test_decode_matches_reconstruction() {
        let plane = ramp_plane(16, 12);
        for qp in [0, 12, 24, 37, 51] {
            let codebook = Codebook::builtin().unwrap();
            let codec = PlaneCodec::new(Qp::new(qp).unwrap(), &codebook);
            assert_eq!(roundtrip(&plane, qp), codec.reconstruct(&plane));
        }
    }

    #[test]
    fn test_all_zero_plane() {
        let plane = Plane::filled(8, 8, 0).unwrap();
        let codebook = Codebook::builtin().unwrap();
        let codec = PlaneCodec::new(Qp::default(), &codebook);

        let mut writer = BitstreamWriter::new();
        codec
            .encode(&plane, &mut DcPredictor::new(), &mut writer)
            .unwrap();
        // each block is a zero DC followed by EOB, both the (0, 0) code
        let (_, eob_len) = codebook
            .table_for(SymbolClass::Ac)
            .code((0, 0))
            .unwrap();
        assert_eq!(writer.bit_len(), 4 * 2 * eob_len as usize);

        assert_eq!(roundtrip(&plane, 24), plane);
    }

    #[test]
    fn test_oversized_dc_delta_is_an_error() {
        let codebook = Codebook::builtin().unwrap();
        let codec = PlaneCodec::new(Qp::default(), &codebook);
        let vlc = HuffmanCodec::new(&codebook);

        // valid codes whose DC deltas keep growing past any real block
        let mut writer = BitstreamWriter::new();
        for _ in 0..4 {
            vlc.encode(&mut writer, Symbol::new(0, 32767), SymbolClass::Dc)
                .unwrap();
            vlc.encode(&mut writer, Symbol::EOB, SymbolClass::Ac).unwrap();
        }
        let bytes = writer.into_bytes();

        let mut reader = BitstreamReader::new(&bytes);
        let err = codec
            .decode(&mut reader, 8, 8, &mut DcPredictor::new())
            .unwrap_err();
        assert!(matches!(err, Error::DcOutOfRange { previous: 0, delta: 32767 }));
        assert!(err.is_stream_error());
    }

    #[test]
    fn test_literal_extremes_do_not_overflow() {
        let codebook = Codebook::from_json(
            r#"{ "keying": "literal", "table": [
                { "run": 0, "key": 0, "length": 2 },
                { "run": 0, "key": 2147483647, "length": 2 },
                { "run": 0, "key": -2147483648, "length": 2 },
                { "run": 13, "key": 2147483647, "length": 2 }
            ] }"#,
        )
        .unwrap();
        let vlc = HuffmanCodec::new(&codebook);

        // huge AC levels dequantize in 64-bit and clamp
        let mut writer = BitstreamWriter::new();
        vlc.encode(&mut writer, Symbol::new(0, 0), SymbolClass::Dc).unwrap();
        vlc.encode(&mut writer, Symbol::new(0, i32::MIN), SymbolClass::Ac)
            .unwrap();
        vlc.encode(&mut writer, Symbol::new(13, i32::MAX), SymbolClass::Ac)
            .unwrap();
        let bytes = writer.into_bytes();
        for qp in [0, 51] {
            let codec = PlaneCodec::new(Qp::new(qp).unwrap(), &codebook);
            let mut reader = BitstreamReader::new(&bytes);
            let plane = codec
                .decode(&mut reader, 4, 4, &mut DcPredictor::new())
                .unwrap();
            assert_eq!(plane.data().len(), 16);
        }

        // a huge DC is rejected
        let mut writer = BitstreamWriter::new();
        vlc.encode(&mut writer, Symbol::new(0, i32::MAX), SymbolClass::Dc)
            .unwrap();
        vlc.encode(&mut writer, Symbol::EOB, SymbolClass::Ac).unwrap();
        let bytes = writer.into_bytes();
        let codec = PlaneCodec::new(Qp::default(), &codebook);
        let mut reader = BitstreamReader::new(&bytes);
        assert!(matches!(
            codec.decode(&mut reader, 4, 4, &mut DcPredictor::new()),
            Err(Error::DcOutOfRange { .. })
        ));
    }

    #[test]
    fn test_truncated_plane() {
        let plane = ramp_plane(8, 8);
        let codebook = Codebook::builtin().unwrap();
        let codec = PlaneCodec::new(Qp::new(10).unwrap(), &codebook);

        let mut writer = BitstreamWriter::new();
        codec
            .encode(&plane, &mut DcPredictor::new(), &mut writer)
            .unwrap();
        let mut bytes = writer.into_bytes();
        bytes.truncate(bytes.len() / 2);

        let mut reader = BitstreamReader::new(&bytes);
        let err = codec
            .decode(&mut reader, 8, 8, &mut DcPredictor::new())
            .unwrap_err();
        assert!(err.is_stream_error());
    }
}
