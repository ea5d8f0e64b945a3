//! Y4M muxer implementation

use crate::codec::tiny::config::FrameRate;
use crate::codec::tiny::frame::YuvFrame;
use crate::error::{Error, Result};
use std::io::Write;

/// Writes [`YuvFrame`]s as 4:2:0 YUV4MPEG2
pub struct Y4mMuxer<W: Write> {
    encoder: y4m::Encoder<W>,
    width: usize,
    height: usize,
    frames_written: u64,
}

impl<W: Write> Y4mMuxer<W> {
    /// Write the stream header
    pub fn new(writer: W, width: usize, height: usize, frame_rate: FrameRate) -> Result<Self> {
        let rate = y4m::Ratio::new(frame_rate.num as usize, frame_rate.den as usize);
        let encoder = y4m::encode(width, height, rate)
            .with_colorspace(y4m::Colorspace::C420jpeg)
            .write_header(writer)
            .map_err(|e| Error::format(format!("Failed to write Y4M header: {}", e)))?;

        Ok(Y4mMuxer {
            encoder,
            width,
            height,
            frames_written: 0,
        })
    }

    /// Append one frame
    pub fn write_frame(&mut self, frame: &YuvFrame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(Error::invalid_input(format!(
                "frame is {}x{}, Y4M stream is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let [y, u, v] = frame.planes();
        let out = y4m::Frame::new([y.data(), u.data(), v.data()], None);
        self.encoder
            .write_frame(&out)
            .map_err(|e| Error::format(format!("Failed to write frame: {}", e)))?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
