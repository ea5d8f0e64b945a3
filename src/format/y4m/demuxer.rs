//! Y4M demuxer implementation

use crate::codec::tiny::config::FrameRate;
use crate::codec::tiny::frame::{validate_frame_dimensions, YuvFrame};
use crate::codec::tiny::plane::Plane;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Chroma layout of the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChromaLayout {
    Yuv420,
    Yuv444,
    Mono,
}

impl ChromaLayout {
    fn from_colorspace(colorspace: y4m::Colorspace) -> Result<Self> {
        match colorspace {
            y4m::Colorspace::C420 | y4m::Colorspace::C420jpeg | y4m::Colorspace::C420paldv => {
                Ok(ChromaLayout::Yuv420)
            }
            y4m::Colorspace::C444 => Ok(ChromaLayout::Yuv444),
            y4m::Colorspace::Cmono => Ok(ChromaLayout::Mono),
            other => Err(Error::format(format!(
                "unsupported Y4M colorspace {:?} (need 8-bit 4:2:0, 4:4:4 or mono)",
                other
            ))),
        }
    }
}

/// Reads YUV4MPEG2 frames as 4:2:0 [`YuvFrame`]s
pub struct Y4mDemuxer<R: Read> {
    decoder: y4m::Decoder<R>,
    width: usize,
    height: usize,
    frame_rate: FrameRate,
    layout: ChromaLayout,
    frames_read: u64,
}

impl Y4mDemuxer<BufReader<File>> {
    /// Open a Y4M file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::format(format!("Failed to open {}: {}", path.display(), e)))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> Y4mDemuxer<R> {
    /// Parse the stream header
    pub fn new(reader: R) -> Result<Self> {
        let decoder = y4m::decode(reader)
            .map_err(|e| Error::format(format!("Failed to decode Y4M header: {}", e)))?;

        let width = decoder.get_width();
        let height = decoder.get_height();
        let framerate = decoder.get_framerate();
        let colorspace = decoder.get_colorspace();

        if decoder.get_bit_depth() != 8 {
            return Err(Error::format(format!(
                "{}-bit Y4M input is not supported",
                decoder.get_bit_depth()
            )));
        }
        let layout = ChromaLayout::from_colorspace(colorspace)?;
        validate_frame_dimensions(width, height)?;

        debug!(
            "Y4M input: {}x{} {:?} at {}/{}",
            width, height, colorspace, framerate.num, framerate.den
        );

        Ok(Y4mDemuxer {
            decoder,
            width,
            height,
            frame_rate: FrameRate::new(framerate.num as u32, framerate.den as u32),
            layout,
            frames_read: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next frame, `None` at end of file
    pub fn read_frame(&mut self) -> Result<Option<YuvFrame>> {
        let (width, height, layout) = (self.width, self.height, self.layout);
        let frame = match self.decoder.read_frame() {
            Ok(frame) => frame,
            Err(y4m::Error::EOF) => return Ok(None),
            Err(e) => return Err(Error::format(format!("Failed to read frame: {}", e))),
        };

        let luma = Plane::new(width, height, frame.get_y_plane().to_vec())?;
        let yuv = match layout {
            ChromaLayout::Yuv420 => YuvFrame::new(
                luma,
                Plane::new(width / 2, height / 2, frame.get_u_plane().to_vec())?,
                Plane::new(width / 2, height / 2, frame.get_v_plane().to_vec())?,
            )?,
            ChromaLayout::Yuv444 => YuvFrame::from_444(
                luma,
                &Plane::new(width, height, frame.get_u_plane().to_vec())?,
                &Plane::new(width, height, frame.get_v_plane().to_vec())?,
            )?,
            ChromaLayout::Mono => YuvFrame::new(
                luma,
                Plane::filled(width / 2, height / 2, 128)?,
                Plane::filled(width / 2, height / 2, 128)?,
            )?,
        };

        self.frames_read += 1;
        Ok(Some(yuv))
    }

    /// Read every remaining frame
    pub fn read_all(&mut self) -> Result<Vec<YuvFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}
