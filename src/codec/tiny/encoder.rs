//! Session encoder: frames in, one header-less bitstream out

use super::bitstream::BitstreamWriter;
use super::config::{DcReset, EncoderConfig, FrameRate, StreamInfo};
use super::frame::{validate_frame_dimensions, FrameCodec, FrameDcState, YuvFrame};
use super::huffman::Codebook;
use crate::error::{Error, Result};
use rayon::prelude::*;
use std::io::Write;
use tracing::{debug, info};

/// Streams encoded frames into a byte sink
///
/// Complete bytes go to the sink as soon as a frame is done; the final
/// partial byte is zero-padded by [`finish`](Self::finish). Frames are
/// concatenated at bit granularity with no padding between them.
pub struct TinyEncoder<'a, W: Write> {
    sink: W,
    codec: FrameCodec<'a>,
    config: EncoderConfig,
    state: FrameDcState,
    pending: BitstreamWriter,
    info: StreamInfo,
    bytes_written: u64,
}

impl<'a, W: Write> TinyEncoder<'a, W> {
    /// Start a session for `width` x `height` frames
    pub fn new(
        sink: W,
        codebook: &'a Codebook,
        config: EncoderConfig,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        validate_frame_dimensions(width, height)?;
        debug!(
            "Tiny encoder: {}x{}, QP {}, DC reset {}, parallel {}",
            width, height, config.qp, config.dc_reset, config.parallel
        );
        Ok(TinyEncoder {
            sink,
            codec: FrameCodec::new(config.qp, codebook).with_parallel(config.parallel),
            config,
            state: FrameDcState::new(),
            pending: BitstreamWriter::new(),
            info: StreamInfo::new(width, height, &config),
            bytes_written: 0,
        })
    }

    /// Record the source frame rate in the stream info
    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) {
        self.info.frame_rate = frame_rate;
    }

    /// Encode one frame
    ///
    /// On error the DC state and the buffered partial byte are left as they
    /// were, so the frame can be retried.
    pub fn encode_frame(&mut self, frame: &YuvFrame) -> Result<()> {
        self.check_frame(frame)?;
        let mut state = match self.config.dc_reset {
            DcReset::PerFrame => FrameDcState::new(),
            DcReset::Session => self.state,
        };

        let bits = self.codec.encode_to_bits(frame, &mut state)?;
        self.commit(&bits)?;
        self.state = state;
        Ok(())
    }

    /// Encode several frames, in parallel when frames are independent
    ///
    /// With [`DcReset::Session`] frames depend on each other's DC state and
    /// are encoded one by one. Frames before a failing one are still written.
    pub fn encode_batch(&mut self, frames: &[YuvFrame]) -> Result<()> {
        if self.config.dc_reset == DcReset::Session || !self.config.parallel {
            for frame in frames {
                self.encode_frame(frame)?;
            }
            return Ok(());
        }

        let codec = self.codec;
        let width = self.info.width;
        let height = self.info.height;
        let encoded: Vec<Result<BitstreamWriter>> = frames
            .par_iter()
            .map(|frame| {
                check_dimensions(frame, width, height)?;
                codec.encode_to_bits(frame, &mut FrameDcState::new())
            })
            .collect();

        for bits in encoded {
            self.commit(&bits?)?;
        }
        Ok(())
    }

    fn check_frame(&self, frame: &YuvFrame) -> Result<()> {
        check_dimensions(frame, self.info.width, self.info.height)
    }

    /// Write a finished frame; on a sink error the pending bits are kept
    fn commit(&mut self, bits: &BitstreamWriter) -> Result<()> {
        let mut pending = self.pending.clone();
        pending.append(bits);
        let bytes = pending.take_complete_bytes();
        self.sink.write_all(&bytes)?;
        self.pending = pending;
        self.bytes_written += bytes.len() as u64;
        self.info.frame_count += 1;
        Ok(())
    }

    /// Frames encoded so far
    pub fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    pub fn stream_info(&self) -> StreamInfo {
        self.info
    }

    /// Pad the last byte, flush the sink and return it with the stream info
    pub fn finish(mut self) -> Result<(W, StreamInfo)> {
        let tail = std::mem::take(&mut self.pending).into_bytes();
        self.sink.write_all(&tail)?;
        self.sink.flush()?;
        self.bytes_written += tail.len() as u64;

        info!(
            "Encoded {} frames ({}x{}, QP {}) into {} bytes",
            self.info.frame_count,
            self.info.width,
            self.info.height,
            self.info.qp,
            self.bytes_written
        );
        Ok((self.sink, self.info))
    }
}

fn check_dimensions(frame: &YuvFrame, width: usize, height: usize) -> Result<()> {
    if frame.width() != width || frame.height() != height {
        return Err(Error::invalid_input(format!(
            "frame is {}x{}, stream is {}x{}",
            frame.width(),
            frame.height(),
            width,
            height
        )));
    }
    Ok(())
}

/// Encode `frames` into an in-memory stream
pub fn encode_frames(
    frames: &[YuvFrame],
    codebook: &Codebook,
    config: EncoderConfig,
) -> Result<(Vec<u8>, StreamInfo)> {
    let first = frames
        .first()
        .ok_or_else(|| Error::invalid_input("no frames to encode"))?;
    let mut encoder = TinyEncoder::new(
        Vec::new(),
        codebook,
        config,
        first.width(),
        first.height(),
    )?;
    encoder.encode_batch(frames)?;
    encoder.finish()
}
