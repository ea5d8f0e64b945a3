//! Differential coding of block DC coefficients
//!
//! Each block's DC is replaced by its difference from the previous block's DC
//! in the same plane. The predictor starts at zero and is reset according to
//! the session's [`DcReset`](super::config::DcReset) policy.

use crate::error::{Error, Result};

/// Largest quantized DC magnitude a block can produce
///
/// The DC coefficient is the block sum (at most 16 * 255) scaled by less than
/// one, so a reconstructed DC outside this range means the stream is corrupt.
pub const MAX_DC_LEVEL: i32 = 16 * 255;

/// Running DC state for one plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DcPredictor {
    previous: i32,
}

impl DcPredictor {
    pub const fn new() -> Self {
        Self { previous: 0 }
    }

    /// Forget history; the next block is predicted from 0
    pub fn reset(&mut self) {
        self.previous = 0;
    }

    /// Last DC seen
    pub fn previous(&self) -> i32 {
        self.previous
    }

    /// Encoder side: return the delta for `dc` and remember it
    pub fn predict(&mut self, dc: i32) -> i32 {
        let delta = dc - self.previous;
        self.previous = dc;
        delta
    }

    /// Decoder side: rebuild the DC from a delta and remember it
    ///
    /// # Errors
    /// `DcOutOfRange` if the result leaves [-MAX_DC_LEVEL, MAX_DC_LEVEL];
    /// the predictor is left unchanged.
    pub fn accumulate(&mut self, delta: i32) -> Result<i32> {
        let dc = self.previous as i64 + delta as i64;
        if dc.abs() > MAX_DC_LEVEL as i64 {
            return Err(Error::DcOutOfRange {
                previous: self.previous,
                delta,
            });
        }
        self.previous = dc as i32;
        Ok(self.previous)
    }
}

/// Delta-code a whole sequence of DC values from a fresh predictor
pub fn predict_sequence(dcs: &[i32]) -> Vec<i32> {
    let mut predictor = DcPredictor::new();
    dcs.iter().map(|&dc| predictor.predict(dc)).collect()
}

/// Inverse of [`predict_sequence`]
pub fn accumulate_sequence(deltas: &[i32]) -> Result<Vec<i32>> {
    let mut predictor = DcPredictor::new();
    deltas.iter().map(|&d| predictor.accumulate(d)).collect()
}
