//! 4:2:0 frames and the three-plane frame codec

use super::bitstream::{BitstreamReader, BitstreamWriter};
use super::dc::DcPredictor;
use super::huffman::Codebook;
use super::plane::{Plane, PlaneCodec};
use super::transform::Qp;
use crate::error::{Error, Result};
use tracing::debug;

/// The three planes of a frame, in bitstream order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneKind {
    Luma,
    Cb,
    Cr,
}

impl PlaneKind {
    /// Bitstream order
    pub const ALL: [PlaneKind; 3] = [PlaneKind::Luma, PlaneKind::Cb, PlaneKind::Cr];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlaneKind::Luma => 0,
            PlaneKind::Cb => 1,
            PlaneKind::Cr => 2,
        }
    }
}

/// A 4:2:0 frame: full-resolution luma, chroma halved in both directions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    planes: [Plane; 3],
}

impl YuvFrame {
    /// Build a frame from already subsampled planes
    pub fn new(luma: Plane, cb: Plane, cr: Plane) -> Result<Self> {
        validate_frame_dimensions(luma.width(), luma.height())?;
        let expected = (luma.width() / 2, luma.height() / 2);
        for chroma in [&cb, &cr] {
            if (chroma.width(), chroma.height()) != expected {
                return Err(Error::invalid_input(format!(
                    "chroma plane {}x{} does not match luma {}x{} (expected {}x{})",
                    chroma.width(),
                    chroma.height(),
                    luma.width(),
                    luma.height(),
                    expected.0,
                    expected.1
                )));
            }
        }
        Ok(YuvFrame {
            planes: [luma, cb, cr],
        })
    }

    /// Build a frame from full-resolution chroma by decimation
    pub fn from_444(luma: Plane, cb: &Plane, cr: &Plane) -> Result<Self> {
        for chroma in [cb, cr] {
            if (chroma.width(), chroma.height()) != (luma.width(), luma.height()) {
                return Err(Error::invalid_input(
                    "4:4:4 chroma planes must match the luma plane",
                ));
            }
        }
        validate_frame_dimensions(luma.width(), luma.height())?;
        let cb = cb.decimate()?;
        let cr = cr.decimate()?;
        Self::new(luma, cb, cr)
    }

    /// Uniform frame
    pub fn filled(width: usize, height: usize, y: u8, cb: u8, cr: u8) -> Result<Self> {
        validate_frame_dimensions(width, height)?;
        Self::new(
            Plane::filled(width, height, y)?,
            Plane::filled(width / 2, height / 2, cb)?,
            Plane::filled(width / 2, height / 2, cr)?,
        )
    }

    /// Luma width
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    /// Luma height
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    pub fn plane(&self, kind: PlaneKind) -> &Plane {
        &self.planes[kind.index()]
    }

    pub fn luma(&self) -> &Plane {
        &self.planes[0]
    }

    /// Planes in luma, Cb, Cr order
    pub fn planes(&self) -> &[Plane; 3] {
        &self.planes
    }

    /// Luma plus nearest-neighbour upsampled chroma
    pub fn upsample_chroma(&self) -> [Plane; 3] {
        [
            self.planes[0].clone(),
            self.planes[1].upsample(),
            self.planes[2].upsample(),
        ]
    }
}

/// Luma dimensions must be non-zero multiples of 8 so chroma tiles evenly
pub fn validate_frame_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height, "frame is empty"));
    }
    if width % 8 != 0 || height % 8 != 0 {
        return Err(Error::invalid_dimensions(
            width,
            height,
            "frame dimensions must be multiples of 8 for 4:2:0 tiling",
        ));
    }
    Ok(())
}

/// DC predictors of the three planes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDcState {
    predictors: [DcPredictor; 3],
}

impl FrameDcState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        for predictor in &mut self.predictors {
            predictor.reset();
        }
    }

    pub fn predictor(&self, kind: PlaneKind) -> &DcPredictor {
        &self.predictors[kind.index()]
    }
}

/// Encodes and decodes whole frames as luma, Cb, Cr plane bitstreams
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec<'a> {
    planes: PlaneCodec<'a>,
    parallel: bool,
}

impl<'a> FrameCodec<'a> {
    pub fn new(qp: Qp, codebook: &'a Codebook) -> Self {
        Self {
            planes: PlaneCodec::new(qp, codebook),
            parallel: true,
        }
    }

    /// Encode the three planes on the rayon pool (default) or one by one
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn qp(&self) -> Qp {
        self.planes.qp()
    }

    /// Encode `frame` and append its bits to `writer`
    ///
    /// Nothing is appended and `state` is unchanged if any plane fails.
    pub fn encode(
        &self,
        frame: &YuvFrame,
        state: &mut FrameDcState,
        writer: &mut BitstreamWriter,
    ) -> Result<()> {
        let bits = self.encode_to_bits(frame, state)?;
        writer.append(&bits);
        Ok(())
    }

    /// Encode `frame` into a fresh bit buffer
    pub fn encode_to_bits(
        &self,
        frame: &YuvFrame,
        state: &mut FrameDcState,
    ) -> Result<BitstreamWriter> {
        let [luma, cb, cr] = frame.planes();
        let [p_luma, p_cb, p_cr] = state.predictors;

        let (luma_out, (cb_out, cr_out)) = if self.parallel {
            rayon::join(
                || self.encode_plane(luma, p_luma),
                || {
                    rayon::join(
                        || self.encode_plane(cb, p_cb),
                        || self.encode_plane(cr, p_cr),
                    )
                },
            )
        } else {
            (
                self.encode_plane(luma, p_luma),
                (self.encode_plane(cb, p_cb), self.encode_plane(cr, p_cr)),
            )
        };

        let (mut bits, p_luma) = luma_out?;
        let (cb_bits, p_cb) = cb_out?;
        let (cr_bits, p_cr) = cr_out?;
        bits.append(&cb_bits);
        bits.append(&cr_bits);
        state.predictors = [p_luma, p_cb, p_cr];

        debug!(
            "Encoded {}x{} frame: {} bits (Y {}, Cb {}, Cr {})",
            frame.width(),
            frame.height(),
            bits.bit_len(),
            bits.bit_len() - cb_bits.bit_len() - cr_bits.bit_len(),
            cb_bits.bit_len(),
            cr_bits.bit_len()
        );
        Ok(bits)
    }

    fn encode_plane(
        &self,
        plane: &Plane,
        mut predictor: DcPredictor,
    ) -> Result<(BitstreamWriter, DcPredictor)> {
        let mut writer = BitstreamWriter::with_capacity(plane.block_count() * 2);
        self.planes.encode(plane, &mut predictor, &mut writer)?;
        Ok((writer, predictor))
    }

    /// Decode one frame with luma dimensions `width` x `height`
    pub fn decode(
        &self,
        reader: &mut BitstreamReader,
        width: usize,
        height: usize,
        state: &mut FrameDcState,
    ) -> Result<YuvFrame> {
        validate_frame_dimensions(width, height)?;
        let start = reader.position();

        let mut decode_plane = |kind: PlaneKind, w: usize, h: usize| {
            self.planes
                .decode(reader, w, h, &mut state.predictors[kind.index()])
        };
        let luma = decode_plane(PlaneKind::Luma, width, height)?;
        let cb = decode_plane(PlaneKind::Cb, width / 2, height / 2)?;
        let cr = decode_plane(PlaneKind::Cr, width / 2, height / 2)?;

        debug!(
            "Decoded {}x{} frame from {} bits",
            width,
            height,
            reader.position() - start
        );
        YuvFrame::new(luma, cb, cr)
    }

    /// Encoder-side reconstruction of `frame`, no entropy coding
    pub fn reconstruct(&self, frame: &YuvFrame) -> Result<YuvFrame> {
        let [luma, cb, cr] = frame.planes();
        YuvFrame::new(
            self.planes.reconstruct(luma),
            self.planes.reconstruct(cb),
            self.planes.reconstruct(cr),
        )
    }
}
