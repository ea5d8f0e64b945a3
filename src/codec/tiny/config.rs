//! Session configuration and the stream sidecar
//!
//! The bitstream carries no header, so everything a decoder needs to walk it
//! (dimensions, QP, frame count, DC reset policy) travels out of band in a
//! [`StreamInfo`] JSON file written next to the stream.

use super::frame::validate_frame_dimensions;
use super::transform::Qp;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// DC reset policy
// ─────────────────────────────────────────────────────────────────────────────

/// When the per-plane DC predictors return to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcReset {
    /// At the start of every frame (frames are independent)
    #[default]
    PerFrame,
    /// Only at the start of the session
    Session,
}

impl fmt::Display for DcReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DcReset::PerFrame => write!(f, "per-frame"),
            DcReset::Session => write!(f, "session"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Encoder settings fixed for a whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Quantization parameter shared by every block of every plane
    pub qp: Qp,
    pub dc_reset: DcReset,
    /// Use the rayon pool for planes and frame batches
    pub parallel: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            qp: Qp::default(),
            dc_reset: DcReset::PerFrame,
            parallel: true,
        }
    }
}

impl EncoderConfig {
    pub fn new(qp: Qp) -> Self {
        EncoderConfig {
            qp,
            ..Default::default()
        }
    }

    pub fn with_dc_reset(mut self, dc_reset: DcReset) -> Self {
        self.dc_reset = dc_reset;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream info
// ─────────────────────────────────────────────────────────────────────────────

/// Frame rate as a ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const fn new(num: u32, den: u32) -> Self {
        FrameRate { num, den }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate { num: 30, den: 1 }
    }
}

/// Out-of-band description of a bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Luma width
    pub width: usize,
    /// Luma height
    pub height: usize,
    pub qp: Qp,
    pub frame_count: u64,
    #[serde(default)]
    pub frame_rate: FrameRate,
    #[serde(default)]
    pub dc_reset: DcReset,
}

impl StreamInfo {
    /// Info for an empty stream
    pub fn new(width: usize, height: usize, config: &EncoderConfig) -> Self {
        StreamInfo {
            width,
            height,
            qp: config.qp,
            frame_count: 0,
            frame_rate: FrameRate::default(),
            dc_reset: config.dc_reset,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Check the fields a decoder depends on
    pub fn validate(&self) -> Result<()> {
        validate_frame_dimensions(self.width, self.height)?;
        if self.frame_rate.num == 0 || self.frame_rate.den == 0 {
            return Err(Error::config(format!(
                "invalid frame rate {}/{}",
                self.frame_rate.num, self.frame_rate.den
            )));
        }
        Ok(())
    }

    /// `<stream>.json`
    pub fn sidecar_path(stream: &Path) -> PathBuf {
        let mut name = stream.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize stream info: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let info: StreamInfo = serde_json::from_str(&json).map_err(|e| {
            Error::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info.validate()?;
        Ok(info)
    }

    pub fn summary(&self) -> String {
        format!(
            "Stream: {}x{} 4:2:0\n\
             - QP: {}\n\
             - Frames: {}\n\
             - Frame rate: {}/{} ({:.3} fps)\n\
             - DC reset: {}",
            self.width,
            self.height,
            self.qp,
            self.frame_count,
            self.frame_rate.num,
            self.frame_rate.den,
            self.frame_rate.as_f64(),
            self.dc_reset
        )
    }
}
