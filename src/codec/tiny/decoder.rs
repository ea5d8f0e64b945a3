//! Session decoder: walks a header-less bitstream using its [`StreamInfo`]

use super::bitstream::BitstreamReader;
use super::config::{DcReset, StreamInfo};
use super::frame::{FrameCodec, FrameDcState, YuvFrame};
use super::huffman::Codebook;
use crate::error::Result;
use tracing::{debug, warn};

/// Decodes `info.frame_count` frames from a byte buffer
///
/// Decoding is strictly sequential: frame and block boundaries are only
/// known by counting.
pub struct TinyDecoder<'a, 'b> {
    reader: BitstreamReader<'b>,
    codec: FrameCodec<'a>,
    info: StreamInfo,
    state: FrameDcState,
    decoded: u64,
    failed: bool,
}

impl<'a, 'b> TinyDecoder<'a, 'b> {
    pub fn new(data: &'b [u8], codebook: &'a Codebook, info: StreamInfo) -> Result<Self> {
        info.validate()?;
        debug!(
            "Tiny decoder: {} bytes, {}x{}, QP {}, {} frames",
            data.len(),
            info.width,
            info.height,
            info.qp,
            info.frame_count
        );
        Ok(TinyDecoder {
            reader: BitstreamReader::new(data),
            codec: FrameCodec::new(info.qp, codebook).with_parallel(false),
            info,
            state: FrameDcState::new(),
            decoded: 0,
            failed: false,
        })
    }

    /// Next frame, or `None` once every frame has been read
    pub fn decode_frame(&mut self) -> Result<Option<YuvFrame>> {
        if self.decoded == self.info.frame_count {
            return Ok(None);
        }
        if self.info.dc_reset == DcReset::PerFrame {
            self.state.reset();
        }

        let frame = self.codec.decode(
            &mut self.reader,
            self.info.width,
            self.info.height,
            &mut self.state,
        )?;
        self.decoded += 1;

        if self.decoded == self.info.frame_count && !self.reader.at_padding() {
            warn!(
                "{} bits of trailing data after the last frame",
                self.reader.remaining()
            );
        }
        Ok(Some(frame))
    }

    pub fn frames_decoded(&self) -> u64 {
        self.decoded
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.info
    }
}

impl<'a, 'b> Iterator for TinyDecoder<'a, 'b> {
    type Item = Result<YuvFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.decode_frame() {
            Ok(frame) => frame.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode every frame of an in-memory stream
pub fn decode_all(data: &[u8], codebook: &Codebook, info: StreamInfo) -> Result<Vec<YuvFrame>> {
    TinyDecoder::new(data, codebook, info)?.collect()
}
